//! Symbol Resolver Module
//!
//! Maps free-text entity mentions onto canonical ticker symbols using an
//! alias index built from the symbol master, with weighted fuzzy matching as
//! the fallback for inexact mentions.

pub mod fuzzy;
pub mod registry;
pub mod resolver;

pub use registry::{load_baseline_symbols, load_manual_aliases, load_symbol_master, load_watchlist};
pub use resolver::{normalize, ResolverConfig, SymbolResolver};
