mod bag;
mod common;
