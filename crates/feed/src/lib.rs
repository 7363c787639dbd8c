pub mod upbit;
