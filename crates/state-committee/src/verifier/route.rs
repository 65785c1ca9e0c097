use crate::EvidenceError;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_relations::r1cs::SynthesisError;
use ark_serialize::{CanonicalDeserialize, SerializationError};
use std::{collections::BTreeMap, convert::TryFrom, fmt, sync::Arc};

/// The committee size classes a proof circuit can be built for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregateBucket {
    /// One signer, no aggregation
    Single,
    Agg16,
    Agg32,
    Agg64,
    Agg128,
    Agg256,
    Agg512,
}

impl AggregateBucket {
    pub const ALL: [AggregateBucket; 7] = [
        AggregateBucket::Single,
        AggregateBucket::Agg16,
        AggregateBucket::Agg32,
        AggregateBucket::Agg64,
        AggregateBucket::Agg128,
        AggregateBucket::Agg256,
        AggregateBucket::Agg512,
    ];

    /// The largest committee the bucket's circuit accepts
    pub fn size(&self) -> u32 {
        match self {
            AggregateBucket::Single => 1,
            AggregateBucket::Agg16 => 16,
            AggregateBucket::Agg32 => 32,
            AggregateBucket::Agg64 => 64,
            AggregateBucket::Agg128 => 128,
            AggregateBucket::Agg256 => 256,
            AggregateBucket::Agg512 => 512,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        *self != AggregateBucket::Single
    }
}

impl TryFrom<u32> for AggregateBucket {
    type Error = EvidenceError;

    /// Only the exact bucket sizes are accepted, there is no rounding up to the next bucket
    fn try_from(size: u32) -> Result<Self, Self::Error> {
        AggregateBucket::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.size() == size)
            .ok_or(EvidenceError::UnknownAggregateSize(size))
    }
}

/// A proof-verification capability for one circuit
pub trait CircuitVerifier: Send + Sync {
    /// Number of public inputs the circuit was built with
    fn num_public_inputs(&self) -> usize;

    /// Runs the pairing check of `proof` against `public_inputs`
    fn verify(&self, proof: &Proof<Bn254>, public_inputs: &[Fr]) -> Result<bool, SynthesisError>;
}

/// Verifies Groth16 proofs of a single circuit over BN254
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    pub fn new(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            pvk: prepare_verifying_key(vk),
        }
    }

    /// Loads a verifying key in arkworks' compressed serialization, checking every point
    pub fn from_compressed_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)?;
        Ok(Self::new(&vk))
    }
}

impl From<&VerifyingKey<Bn254>> for Groth16Verifier {
    fn from(vk: &VerifyingKey<Bn254>) -> Self {
        Self::new(vk)
    }
}

impl CircuitVerifier for Groth16Verifier {
    fn num_public_inputs(&self) -> usize {
        self.pvk.vk.gamma_abc_g1.len().saturating_sub(1)
    }

    fn verify(&self, proof: &Proof<Bn254>, public_inputs: &[Fr]) -> Result<bool, SynthesisError> {
        Groth16::<Bn254>::verify_proof(&self.pvk, proof, public_inputs)
    }
}

/// One verifier per routed bucket. Buckets without a verifier are rejected with
/// [`EvidenceError::UnknownAggregateSize`].
#[derive(Clone, Default)]
pub struct VerifierRoutes {
    routes: BTreeMap<AggregateBucket, Arc<dyn CircuitVerifier>>,
}

impl fmt::Debug for VerifierRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

impl VerifierRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `bucket` to `verifier`. Each bucket takes exactly one verifier, and the single
    /// signer circuit may not double as an aggregate one.
    pub fn register(
        &mut self,
        bucket: AggregateBucket,
        verifier: Arc<dyn CircuitVerifier>,
    ) -> Result<(), EvidenceError> {
        if self.routes.contains_key(&bucket) {
            return Err(EvidenceError::DuplicateRoute(bucket));
        }
        let shared_with_single = self.routes.iter().any(|(routed, existing)| {
            routed.is_aggregate() != bucket.is_aggregate() && Arc::ptr_eq(existing, &verifier)
        });
        if shared_with_single {
            return Err(EvidenceError::DuplicateRoute(bucket));
        }
        self.routes.insert(bucket, verifier);
        Ok(())
    }

    /// Builder flavor of [`VerifierRoutes::register`]
    pub fn with_route(
        mut self,
        bucket: AggregateBucket,
        verifier: Arc<dyn CircuitVerifier>,
    ) -> Result<Self, EvidenceError> {
        self.register(bucket, verifier)?;
        Ok(self)
    }

    pub fn route(&self, bucket: AggregateBucket) -> Result<&dyn CircuitVerifier, EvidenceError> {
        self.routes
            .get(&bucket)
            .map(|verifier| verifier.as_ref())
            .ok_or(EvidenceError::UnknownAggregateSize(bucket.size()))
    }

    pub fn buckets(&self) -> impl Iterator<Item = AggregateBucket> + '_ {
        self.routes.keys().copied()
    }
}
