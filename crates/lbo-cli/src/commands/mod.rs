pub mod lbo;
