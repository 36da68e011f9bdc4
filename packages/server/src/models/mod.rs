pub mod bag;
