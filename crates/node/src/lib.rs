#![forbid(unsafe_code)]

//! # Animica Node Core
//!
//! The block-production substrate on top of the component crates: the header
//! assembler that binds tx, state, DA, beacon, and PoIES outputs into a
//! canonical header; block invariant verification; the RPC method contracts;
//! and the node wiring that owns every shared component with an explicit
//! lifetime.

/// Node configuration assembled from defaults and the environment.
pub mod config;
/// Header assembly and block verification.
pub mod header;
/// Component ownership and lifecycle wiring.
pub mod node;
/// Typed RPC method handlers (no transport).
pub mod rpc;

pub use config::NodeConfig;
pub use header::{
    verify_block, verify_proposer_signature, BeaconSource, HeaderAssembler, HeaderInputs,
    HeaderSigner,
};
pub use node::Node;
pub use rpc::RpcHandler;
