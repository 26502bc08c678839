//! Certificates and the prove/verify capability behind them.
//!
//! A [Certificate] pairs a transition's [PublicOutput] with the digest of the
//! predecessor output it was derived from and an opaque proof. The reducer
//! never trusts a certificate on its own: it asks an injected
//! [CertificateVerifier] before building on it, and an injected [ProofBackend]
//! to produce the proof of each new certificate.
//!
//! [Attestor] is the backend shipped with this crate. It signs
//! `(method, output, predecessor)` with an ed25519 key under the configured
//! certificate namespace. Any party holding the public key can verify with
//! [AttestationVerifier].

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    sha256::Digest,
    Signer, Verifier,
};
use lottery_types::{Method, PublicOutput};

use crate::Phase;

/// Immutable output of one transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate<P> {
    method: Method,
    output: PublicOutput,
    predecessor: Option<Digest>,
    proof: P,
}

impl<P> Certificate<P> {
    /// Assemble a certificate from its parts.
    ///
    /// The result is unverified; pass it through a [CertificateVerifier]
    /// before relying on it.
    pub fn from_parts(
        method: Method,
        output: PublicOutput,
        predecessor: Option<Digest>,
        proof: P,
    ) -> Self {
        Self {
            method,
            output,
            predecessor,
            proof,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn output(&self) -> &PublicOutput {
        &self.output
    }

    /// Digest of the predecessor's output (`None` only for `init`).
    pub fn predecessor(&self) -> Option<&Digest> {
        self.predecessor.as_ref()
    }

    pub fn proof(&self) -> &P {
        &self.proof
    }

    pub fn phase(&self) -> Phase {
        Phase::after(self.method)
    }
}

impl<P: Write> Write for Certificate<P> {
    fn write(&self, writer: &mut impl BufMut) {
        self.method.write(writer);
        self.output.write(writer);
        self.predecessor.write(writer);
        self.proof.write(writer);
    }
}

impl<P: Read<Cfg = ()>> Read for Certificate<P> {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            method: Method::read(reader)?,
            output: PublicOutput::read(reader)?,
            predecessor: Option::<Digest>::read(reader)?,
            proof: P::read(reader)?,
        })
    }
}

impl<P: EncodeSize> EncodeSize for Certificate<P> {
    fn encode_size(&self) -> usize {
        self.method.encode_size()
            + self.output.encode_size()
            + self.predecessor.encode_size()
            + self.proof.encode_size()
    }
}

/// Checks certificates produced by a matching [ProofBackend].
pub trait CertificateVerifier {
    type Proof;

    fn verify(&self, certificate: &Certificate<Self::Proof>) -> bool;
}

/// Produces proofs for new certificates.
pub trait ProofBackend: CertificateVerifier {
    fn prove(
        &self,
        method: Method,
        output: &PublicOutput,
        predecessor: Option<&Digest>,
    ) -> Self::Proof;
}

fn payload(method: Method, output: &PublicOutput, predecessor: Option<&Digest>) -> Vec<u8> {
    let mut payload = Vec::new();
    method.write(&mut payload);
    output.write(&mut payload);
    predecessor.copied().write(&mut payload);
    payload
}

/// Verify-only half of [Attestor].
#[derive(Clone, Debug)]
pub struct AttestationVerifier {
    public: PublicKey,
    namespace: Vec<u8>,
}

impl AttestationVerifier {
    pub fn new(public: PublicKey, namespace: Vec<u8>) -> Self {
        Self { public, namespace }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl CertificateVerifier for AttestationVerifier {
    type Proof = Signature;

    fn verify(&self, certificate: &Certificate<Signature>) -> bool {
        self.public.verify(
            self.namespace.as_slice(),
            &payload(
                certificate.method,
                &certificate.output,
                certificate.predecessor.as_ref(),
            ),
            &certificate.proof,
        )
    }
}

/// Signing backend: attests every certificate the reducer emits.
#[derive(Clone)]
pub struct Attestor {
    signer: PrivateKey,
    verifier: AttestationVerifier,
}

impl Attestor {
    pub fn new(signer: PrivateKey, namespace: Vec<u8>) -> Self {
        let verifier = AttestationVerifier::new(signer.public_key(), namespace);
        Self { signer, verifier }
    }

    pub fn verifier(&self) -> AttestationVerifier {
        self.verifier.clone()
    }
}

impl CertificateVerifier for Attestor {
    type Proof = Signature;

    fn verify(&self, certificate: &Certificate<Signature>) -> bool {
        self.verifier.verify(certificate)
    }
}

impl ProofBackend for Attestor {
    fn prove(
        &self,
        method: Method,
        output: &PublicOutput,
        predecessor: Option<&Digest>,
    ) -> Signature {
        self.signer.sign(
            self.verifier.namespace.as_slice(),
            &payload(method, output, predecessor),
        )
    }
}
