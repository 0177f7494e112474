pub mod airwallex;
pub mod alikassa;
pub mod blockonomics;
pub mod firekassa;
pub mod mulenpay;

pub use self::{
    airwallex::Airwallex, alikassa::Alikassa, blockonomics::Blockonomics, firekassa::Firekassa,
    mulenpay::Mulenpay,
};
