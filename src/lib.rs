pub mod adapter;
pub mod cli;
pub mod fixture;
pub mod p4;
