pub mod client;
pub mod common;
pub mod distributor;
pub mod price_list;
pub mod product;
pub mod proposal;
pub mod responses;
pub mod sale;
pub mod user;

pub use client::*;
pub use common::*;
pub use distributor::*;
pub use price_list::*;
pub use product::*;
pub use proposal::*;
pub use responses::*;
pub use sale::*;
pub use user::*;
