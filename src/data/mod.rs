mod csr;

pub use csr::CsrMatrix;
