pub mod costmatrix;
pub mod movement;
