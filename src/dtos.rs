pub mod coursedtos;
pub mod partnerdtos;
pub mod userdtos;

pub use coursedtos::*;
pub use partnerdtos::*;
pub use userdtos::*;
