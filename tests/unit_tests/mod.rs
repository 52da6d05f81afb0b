
mod coefficients;
mod materials;
mod neighbors;
