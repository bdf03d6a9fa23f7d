//! Sign coordinator

use crate::{classification, Coordinator};
use cosign_chain::Signer;
use cosign_errors::{Error, Result};
use cosign_store::BlobStore;
use cosign_types::{SignMetadata, TxFile, TxPath, TxVersion};
use tracing::info;

/// Inputs of a signature
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub version: TxVersion,
    /// Local key the operator signs with
    pub from: String,
    /// Name the signature artifact is stored under
    pub signer: String,
    /// Multisig group address on the target chain
    pub multisig_address: String,
}

/// Payload and metadata fetched for review before signing
#[derive(Debug, Clone)]
pub struct SignBundle {
    pub version: TxVersion,
    pub payload: Vec<u8>,
    pub metadata: SignMetadata,
}

impl<S: BlobStore> Coordinator<S> {
    /// Fetch what the operator is about to sign
    pub async fn prepare_sign(&self, version: &TxVersion) -> Result<SignBundle> {
        let payload = self.fetch(version, &TxFile::Unsigned).await?;
        let metadata_path = version.path(&TxFile::SignData);
        let metadata_bytes = self.fetch(version, &TxFile::SignData).await?;
        let metadata =
            SignMetadata::from_json(&metadata_bytes).map_err(|e| Error::CorruptMetadata {
                path: metadata_path,
                reason: e.to_string(),
            })?;

        Ok(SignBundle {
            version: version.clone(),
            payload,
            metadata,
        })
    }

    /// Sign a reviewed bundle and upload the artifact.
    ///
    /// Signing again under the same name overwrites the earlier artifact.
    pub async fn complete_sign<G>(
        &self,
        bundle: &SignBundle,
        request: &SignRequest,
        signer: &G,
    ) -> Result<TxPath>
    where
        G: Signer + ?Sized,
    {
        let file = TxFile::signature(&request.signer).map_err(classification)?;

        let signature = signer
            .sign(cosign_chain::SignRequest {
                payload: &bundle.payload,
                multisig_address: &request.multisig_address,
                from: &request.from,
                metadata: &bundle.metadata,
            })
            .await?;

        let path = TxPath::new(bundle.version.clone(), file);
        self.store().put(&path.to_string(), signature).await?;
        info!(%path, signer = %request.signer, "uploaded signature");
        Ok(path)
    }

    /// Fetch, sign and upload without an operator review step
    pub async fn sign<G>(&self, request: &SignRequest, signer: &G) -> Result<TxPath>
    where
        G: Signer + ?Sized,
    {
        let bundle = self.prepare_sign(&request.version).await?;
        self.complete_sign(&bundle, request, signer).await
    }

    pub(crate) async fn fetch(&self, version: &TxVersion, file: &TxFile) -> Result<Vec<u8>> {
        let path = version.path(file);
        let data = self.store().get(&path).await?;
        data.ok_or(Error::VersionNotFound { path })
    }
}
