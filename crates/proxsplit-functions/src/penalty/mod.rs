//! Proximable penalties and indicators.

pub mod elastic_net;
pub mod ind_box;
pub mod ind_soc;
pub mod norm1;
pub mod norm2;
pub mod sum_of_norm2;
pub mod zero;

pub use elastic_net::ElasticNet;
pub use ind_box::IndBox;
pub use ind_soc::IndSoc;
pub use norm1::Norm1;
pub use norm2::Norm2;
pub use sum_of_norm2::SumOfNorm2;
pub use zero::Zero;
