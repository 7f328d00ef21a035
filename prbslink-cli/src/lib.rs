//! Library entry for prbslink-cli used by integration tests and embedding.

pub mod commands;
pub mod loopback;
pub mod report;

// Re-export commands for convenience
pub use commands::*;

use prbslink_core::{PrbsPolynomial, TransportKind};

/// PRBS pattern selectable on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PolynomialArg {
    /// x^7 + x^6 + 1
    Prbs7,
    /// x^15 + x^14 + 1
    Prbs15,
    /// x^23 + x^18 + 1
    Prbs23,
    /// x^31 + x^28 + 1
    Prbs31,
}

impl From<PolynomialArg> for PrbsPolynomial {
    fn from(arg: PolynomialArg) -> Self {
        match arg {
            PolynomialArg::Prbs7 => PrbsPolynomial::Prbs7,
            PolynomialArg::Prbs15 => PrbsPolynomial::Prbs15,
            PolynomialArg::Prbs23 => PrbsPolynomial::Prbs23,
            PolynomialArg::Prbs31 => PrbsPolynomial::Prbs31,
        }
    }
}

/// Transport selectable on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportArg {
    /// Ethernet datagrams
    Eth,
    /// Point-to-point byte stream
    P2p,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Eth => TransportKind::Ethernet,
            TransportArg::P2p => TransportKind::PointToPoint,
        }
    }
}
