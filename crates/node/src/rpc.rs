//! Typed RPC method handlers.
//!
//! These are the core-facing method contracts only; wire framing (HTTP,
//! WebSocket, JSON-RPC envelopes) lives outside the core. Each handler takes
//! typed parameters, returns a serializable response, and maps failures to
//! [`RpcError`] with the structured mempool payload preserved for admission
//! rejections.

use animica_da::commitment::{commit_blob, da_root};
use animica_da::{chunk_blob, BlobStore, DaParams};
use animica_mempool::{Mempool, MempoolEntry};
use animica_randomness::RandomnessService;
use animica_types::address::Address;
use animica_types::app::{BlockHeader, Transaction};
use animica_types::codec::{self, FromCanonical};
use animica_types::config::ChainConfig;
use animica_types::error::{DAError, ErrorCode, RpcError};
use animica_types::hash::Hash32;
use animica_types::prelude::OptionExt;
use animica_types::MAX_WIRE_OBJECT_BYTES;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value as Json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Result of `mempool.submit`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// `"accepted"` on success.
    pub status: &'static str,
    /// Hex hash of the admitted transaction.
    pub tx_hash: String,
}

/// One row of `mempool.inspect`.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    /// Hex transaction hash.
    pub tx_hash: String,
    /// Bech32m sender address.
    pub sender: String,
    /// Sender nonce.
    pub nonce: u64,
    /// Effective fee in wei.
    pub effective_fee_wei: u128,
    /// Encoded size in bytes.
    pub size_bytes: usize,
    /// Whether the transaction was locally submitted.
    pub is_local: bool,
}

/// Result of `da.sampleProof`.
#[derive(Debug, Serialize)]
pub struct SampleProof {
    /// Hex NMT root the samples verify against.
    pub root: String,
    /// The sampled chunk indices.
    pub indices: Vec<u64>,
    /// The chunk bytes at those indices, hex encoded.
    pub chunks: Vec<String>,
}

/// Result of the `rand.*` methods.
#[derive(Debug, Serialize)]
pub struct RandCommitResponse {
    /// The round the commitment landed in.
    pub round_id: u64,
    /// Hex commitment digest.
    pub commitment: String,
}

/// Result of `rand.reveal`.
#[derive(Debug, Serialize)]
pub struct RandRevealResponse {
    /// The round the reveal targeted.
    pub round_id: u64,
    /// Whether the reveal opened a commitment.
    pub ok: bool,
}

/// Result of `rand.getBeacon`.
#[derive(Debug, Serialize)]
pub struct BeaconResponse {
    /// The finalized round.
    pub round_id: u64,
    /// Hex beacon output.
    pub output: String,
}

/// The RPC method surface over shared component handles.
pub struct RpcHandler {
    chain: ChainConfig,
    da_params: DaParams,
    mempool: Arc<Mempool>,
    blob_store: Arc<BlobStore>,
    randomness: Arc<RandomnessService>,
    headers: RwLock<BTreeMap<u64, BlockHeader>>,
    // root → blob content address, so sampling can find stored chunks.
    blob_index: RwLock<HashMap<Hash32, Hash32>>,
}

impl RpcHandler {
    /// Builds the handler over the node's components.
    pub fn new(
        chain: ChainConfig,
        da_params: DaParams,
        mempool: Arc<Mempool>,
        blob_store: Arc<BlobStore>,
        randomness: Arc<RandomnessService>,
    ) -> Self {
        Self {
            chain,
            da_params,
            mempool,
            blob_store,
            randomness,
            headers: RwLock::new(BTreeMap::new()),
            blob_index: RwLock::new(HashMap::new()),
        }
    }

    /// `mempool.submit(raw_tx_bytes, is_local)`.
    ///
    /// Ingress decoding is lenient: a non-canonical but well-formed envelope
    /// is accepted and re-encoded canonically by the object model.
    pub fn mempool_submit(
        &self,
        raw_tx: &[u8],
        is_local: bool,
        expected_nonce: Option<u64>,
    ) -> Result<SubmitResponse, RpcError> {
        if raw_tx.len() > MAX_WIRE_OBJECT_BYTES {
            return Err(RpcError::InvalidParams(format!(
                "raw transaction of {} bytes exceeds the wire limit",
                raw_tx.len()
            )));
        }
        let value = codec::decode(raw_tx)
            .map_err(|e| RpcError::InvalidParams(format!("transaction decode: {e}")))?;
        let tx = Transaction::from_value(&value)
            .map_err(|e| RpcError::InvalidParams(format!("transaction decode: {e}")))?;
        let tx_hash = self.mempool.submit(tx, is_local, expected_nonce)?;
        Ok(SubmitResponse {
            status: "accepted",
            tx_hash: format!("0x{}", hex::encode(tx_hash)),
        })
    }

    /// `mempool.inspect()` — read-only snapshot in block-building order.
    pub fn mempool_inspect(&self) -> Vec<EntrySummary> {
        self.mempool
            .inspect()
            .into_iter()
            .map(|e: MempoolEntry| EntrySummary {
                tx_hash: format!("0x{}", hex::encode(e.tx_hash)),
                sender: e
                    .tx
                    .sender
                    .encode(&self.chain.hrp)
                    .unwrap_or_else(|_| format!("0x{}", hex::encode(e.tx.sender.as_bytes()))),
                nonce: e.tx.nonce,
                effective_fee_wei: e.effective_fee_wei,
                size_bytes: e.size_bytes,
                is_local: e.is_local,
            })
            .collect()
    }

    /// Records a header so `chain.getHeader` can serve it.
    pub fn record_header(&self, header: BlockHeader) {
        self.headers.write().insert(header.height, header);
    }

    /// `chain.getHeader(height)`.
    pub fn chain_get_header(&self, height: u64) -> Result<BlockHeader, RpcError> {
        self.headers
            .read()
            .get(&height)
            .cloned()
            .required(RpcError::NotFound(format!("header at height {height}")))
    }

    /// `da.submitBlob(namespace, data)` — commits and persists the blob.
    pub fn da_submit_blob(
        &self,
        namespace: u64,
        data: &[u8],
    ) -> Result<animica_types::app::BlobCommitment, RpcError> {
        let commitment = commit_blob(namespace, data, &self.da_params)?;
        let digest = self.blob_store.put(data)?;
        self.blob_index.write().insert(commitment.root, digest);
        Ok(commitment)
    }

    /// `da.sampleProof(commitment_root, indices)` — returns the chunks at
    /// the sampled indices for light verification.
    pub fn da_sample_proof(
        &self,
        commitment_root: &Hash32,
        indices: &[u64],
    ) -> Result<SampleProof, RpcError> {
        let digest = self
            .blob_index
            .read()
            .get(commitment_root)
            .copied()
            .ok_or_else(|| RpcError::NotFound(format!("blob {}", hex::encode(commitment_root))))?;
        let blob = self.blob_store.get(&digest)?;
        let chunks = chunk_blob(&blob, self.da_params.chunk_size)?;

        let mut sampled = Vec::with_capacity(indices.len());
        for &i in indices {
            let chunk = chunks
                .get(i as usize)
                .ok_or_else(|| {
                    RpcError::Da(DAError::InvalidParameter(format!(
                        "chunk index {i} out of range ({} chunks)",
                        chunks.len()
                    )))
                })?;
            sampled.push(hex::encode(chunk));
        }
        Ok(SampleProof {
            root: hex::encode(commitment_root),
            indices: indices.to_vec(),
            chunks: sampled,
        })
    }

    /// `rand.commit(address, salt, payload)`.
    pub fn rand_commit(
        &self,
        address: &str,
        salt: &[u8],
        payload: &[u8],
    ) -> Result<RandCommitResponse, RpcError> {
        let (_, addr) = Address::decode(address, Some(&self.chain.hrp))
            .map_err(|e| RpcError::InvalidParams(format!("address: {e}")))?;
        let (round_id, commitment) = self.randomness.commit(addr.as_bytes(), salt, payload)?;
        Ok(RandCommitResponse {
            round_id,
            commitment: format!("0x{}", hex::encode(commitment)),
        })
    }

    /// `rand.reveal(salt, payload)`.
    pub fn rand_reveal(&self, salt: &[u8], payload: &[u8]) -> Result<RandRevealResponse, RpcError> {
        let (round_id, ok) = self.randomness.reveal(salt, payload)?;
        Ok(RandRevealResponse { round_id, ok })
    }

    /// `rand.getBeacon(round_id?)`.
    pub fn rand_get_beacon(&self, round_id: Option<u64>) -> Result<BeaconResponse, RpcError> {
        let (round_id, output) = self.randomness.get_beacon(round_id)?;
        Ok(BeaconResponse {
            round_id,
            output: format!("0x{}", hex::encode(output)),
        })
    }

    /// Recomputes the DA root over an ordered commitment list; exposed for
    /// header tooling and tests.
    pub fn compute_da_root(commitments: &[animica_types::app::BlobCommitment]) -> Hash32 {
        da_root(commitments)
    }

    /// Renders any handler error to the structured error payload carried in
    /// RPC error data. Mempool rejections keep their full admission context.
    pub fn error_payload(err: &RpcError) -> Json {
        match err {
            RpcError::Mempool(e) => e.payload(),
            other => json!({
                "code": other.code(),
                "reason": other.code().to_lowercase(),
                "message": other.to_string(),
                "context": {},
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animica_mempool::{
        AdmissionConfig, AdmissionPolicy, BanList, BanPolicy, FeeWatermark, MempoolConfig,
        WatermarkConfig,
    };
    use animica_randomness::{RandomnessParams, VdfParams};
    use animica_test_utils::{test_tx, ManualClock, seeded_bytes};
    use animica_types::codec::ToCanonical;
    use animica_types::error::MempoolError;

    struct Rig {
        handler: RpcHandler,
        clock: ManualClock,
        _dir: tempfile::TempDir,
    }

    fn rig() -> Rig {
        let clock = ManualClock::new(500.0);
        let chain = ChainConfig::default();
        let watermark = Arc::new(FeeWatermark::new(WatermarkConfig::default()));
        let banlist = Arc::new(BanList::new(BanPolicy::default(), Arc::new(clock.clone())));
        let mempool = Arc::new(Mempool::new(
            MempoolConfig::default(),
            AdmissionPolicy::new(AdmissionConfig {
                allow_chain_id: Some(chain.chain_id),
                ..Default::default()
            }),
            watermark,
            banlist,
            Arc::new(clock.clone()),
        ));
        let dir = tempfile::tempdir().unwrap();
        let blob_store = Arc::new(BlobStore::open(dir.path()).unwrap());
        let randomness = Arc::new(RandomnessService::new(
            RandomnessParams {
                commit_phase_s: 20,
                reveal_phase_s: 10,
                vdf: VdfParams { iterations: 16 },
                ..Default::default()
            },
            Arc::new(clock.clone()),
        ));
        Rig {
            handler: RpcHandler::new(chain, DaParams::default(), mempool, blob_store, randomness),
            clock,
            _dir: dir,
        }
    }

    #[test]
    fn submit_roundtrips_through_the_codec() {
        let r = rig();
        let tx = test_tx(1, 0, 50_000);
        let raw = tx.canonical_bytes();
        let resp = r.handler.mempool_submit(&raw, false, Some(0)).unwrap();
        assert_eq!(resp.status, "accepted");
        assert_eq!(resp.tx_hash, format!("0x{}", hex::encode(tx.hash())));

        let rows = r.handler.mempool_inspect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nonce, 0);
        assert!(rows[0].sender.starts_with("anim1"));
    }

    #[test]
    fn submit_rejections_carry_the_admission_payload() {
        let r = rig();
        let mut tx = test_tx(1, 0, 50_000);
        tx.chain_id = 999;
        let err = r
            .handler
            .mempool_submit(&tx.canonical_bytes(), false, Some(0))
            .unwrap_err();
        match &err {
            RpcError::Mempool(MempoolError::WrongChain { expected, got }) => {
                assert_eq!(*expected, 31337);
                assert_eq!(*got, 999);
            }
            other => panic!("expected WrongChain, got {other:?}"),
        }
        let payload = RpcHandler::error_payload(&err);
        assert_eq!(payload["code"], "WRONG_CHAIN");
        assert_eq!(payload["context"]["got_chain_id"], 999);
    }

    #[test]
    fn garbage_bytes_are_invalid_params() {
        let r = rig();
        let err = r.handler.mempool_submit(&[0xFF, 0x00], false, None).unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));
    }

    #[test]
    fn blob_submit_and_sampling() {
        let r = rig();
        let blob = seeded_bytes(11, 10_000);
        let commitment = r.handler.da_submit_blob(3, &blob).unwrap();
        assert_eq!(commitment.namespace, 3);

        let proof = r
            .handler
            .da_sample_proof(&commitment.root, &[0, 1, commitment.chunk_count - 1])
            .unwrap();
        assert_eq!(proof.chunks.len(), 3);
        assert_eq!(
            hex::decode(&proof.chunks[0]).unwrap(),
            blob[..DaParams::default().chunk_size]
        );

        // Out-of-range samples and unknown roots error cleanly.
        assert!(r
            .handler
            .da_sample_proof(&commitment.root, &[commitment.chunk_count])
            .is_err());
        assert!(matches!(
            r.handler.da_sample_proof(&[0u8; 32], &[0]),
            Err(RpcError::NotFound(_))
        ));
    }

    #[test]
    fn randomness_methods_follow_the_round() {
        let r = rig();
        let addr = animica_test_utils::test_address(9)
            .encode("anim")
            .unwrap();
        let salt = [0xAA; 32];

        let commit = r.handler.rand_commit(&addr, &salt, b"hi").unwrap();
        assert_eq!(commit.round_id, 0);
        assert!(commit.commitment.starts_with("0x"));

        r.clock.advance(21.0);
        let reveal = r.handler.rand_reveal(&salt, b"hi").unwrap();
        assert!(reveal.ok);
        let bad = r.handler.rand_reveal(&salt, b"other").unwrap();
        assert!(!bad.ok);

        // No beacon before finalization.
        assert!(r.handler.rand_get_beacon(None).is_err());
        r.clock.advance(10.0);
        r.handler.randomness.tick();
        let beacon = r.handler.rand_get_beacon(Some(0)).unwrap();
        assert_eq!(beacon.round_id, 0);
        assert_eq!(beacon.output.len(), 2 + 64);
    }

    #[test]
    fn headers_round_trip_through_the_chain_view() {
        let r = rig();
        assert!(r.handler.chain_get_header(5).is_err());
        let header = BlockHeader {
            version: 1,
            height: 5,
            parent: [0; 32],
            timestamp: 0,
            tx_root: [1; 32],
            state_root: [2; 32],
            da_root: [3; 32],
            beacon_root: [4; 32],
            poies_gamma_micro: 0,
            policy_root: [5; 32],
            proposer: animica_test_utils::test_address(1),
            signature: animica_types::app::Signature {
                alg_id: 1,
                bytes: vec![],
            },
        };
        r.handler.record_header(header.clone());
        assert_eq!(r.handler.chain_get_header(5).unwrap(), header);
    }

    #[test]
    fn invalid_address_is_rejected_with_params_error() {
        let r = rig();
        let err = r
            .handler
            .rand_commit("notbech32", &[0; 32], b"p")
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));
    }
}
