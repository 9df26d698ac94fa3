pub mod assembler;
pub mod contracts;
pub mod lot_size;
pub mod normalizer;

pub use assembler::assemble;
pub use contracts::{ContractRegistry, ContractSpec, ResolvedContract, RiskUnit, UnknownSymbolPolicy};
pub use lot_size::{ensure_within_budget, LotResult, LotSizeCalculator};
pub use normalizer::normalize;
