//! MinIO/S3-compatible storage client
//!
//! Uses the rust-s3 crate for object operations. The bucket policy that makes
//! the public prefix anonymously readable is applied with a hand-signed
//! (AWS Signature v4) request since rust-s3 has no policy API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ImageStorage, StoredObject};
use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Folder under the public prefix holding report images
const REPORTS_FOLDER: &str = "reports";

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    public_prefix: String,
    /// Access key for AWS Signature v4 signing
    access_key: String,
    /// Secret key for AWS Signature v4 signing
    secret_key: String,
    /// Region name for AWS Signature v4 signing
    region_name: String,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration
    ///
    /// This will:
    /// 1. Create the bucket if it doesn't exist
    /// 2. Set public read policy for the public prefix
    pub async fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs (http://endpoint/bucket) for MinIO
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: trim_trailing_slash(&config.endpoint),
            public_endpoint: trim_trailing_slash(&config.public_endpoint),
            public_prefix: config.public_prefix,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        };

        client.ensure_bucket_exists().await?;
        client.set_public_read_policy().await?;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.public_prefix
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<()> {
        match self.create_bucket().await {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| {
            AppError::Internal(format!(
                "Failed to create bucket '{}': {}",
                self.bucket.name(),
                e
            ))
        })?;

        Ok(())
    }

    /// Allow anonymous reads under the public prefix (e.g. `public/*`).
    ///
    /// Failure is logged and tolerated; the policy can be set manually.
    async fn set_public_read_policy(&self) -> Result<()> {
        let bucket_name = self.bucket.name();
        let policy = public_read_policy(&bucket_name, &self.public_prefix);

        match self
            .put_bucket_policy_with_sigv4(&bucket_name, &policy)
            .await
        {
            Ok(_) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, self.public_prefix
            ),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. \
                You may need to set the policy manually using: \
                mc anonymous set download minio/{}/{}",
                bucket_name, e, bucket_name, self.public_prefix
            ),
        }
        Ok(())
    }

    async fn put_bucket_policy_with_sigv4(&self, bucket_name: &str, policy: &str) -> Result<()> {
        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let signer = SigV4 {
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            region: &self.region_name,
        };
        let signed = signer.sign_put_policy(bucket_name, &host_header, policy, Utc::now())?;

        let url = format!("{}/{}?policy", self.endpoint, bucket_name);
        let response = self
            .http_client
            .put(&url)
            .header("Host", &host_header)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("Authorization", &signed.authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send policy request: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::Internal(format!(
            "Failed to set bucket policy: {} - {}",
            status, body
        )))
    }

    /// Object key for a report image: `{public_prefix}/reports/{report_id}_{uuid}.{ext}`
    pub fn report_image_key(&self, report_id: i64, extension: &str) -> String {
        report_image_key(&self.public_prefix, report_id, Uuid::new_v4(), extension)
    }

    /// Upload bytes under `key`
    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to upload file '{}': {}", key, e))
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::ExternalServiceError(format!(
                "Upload of '{}' returned status {}",
                key, status
            )));
        }

        debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    /// Delete the object at `key`
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to delete file '{}': {}", key, e))
            })?;

        debug!(
            "Deleted file '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );
        Ok(())
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Direct URL for an object under the public prefix
    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[async_trait]
impl ImageStorage for MinIOClient {
    async fn upload_report_image(
        &self,
        report_id: i64,
        data: Vec<u8>,
        content_type: &str,
        extension: &str,
    ) -> Result<StoredObject> {
        let key = self.report_image_key(report_id, extension);
        self.upload(&key, &data, content_type).await?;

        Ok(StoredObject {
            url: self.get_public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_object(key).await
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn report_image_key(public_prefix: &str, report_id: i64, id: Uuid, extension: &str) -> String {
    format!(
        "{}/{}/{}_{}.{}",
        public_prefix, REPORTS_FOLDER, report_id, id, extension
    )
}

fn public_read_policy(bucket_name: &str, public_prefix: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{bucket_name}/{public_prefix}/*")]
            }
        ]
    })
    .to_string()
}

/// Headers produced by signing a request
struct SignedRequest {
    amz_date: String,
    payload_hash: String,
    authorization: String,
}

/// AWS Signature v4 signer for the S3 service
struct SigV4<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    region: &'a str,
}

impl SigV4<'_> {
    const ALGORITHM: &'static str = "AWS4-HMAC-SHA256";
    const SIGNED_HEADERS: &'static str = "host;x-amz-content-sha256;x-amz-date";

    fn sign_put_policy(
        &self,
        bucket_name: &str,
        host_header: &str,
        policy: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let canonical_request = format!(
            "PUT\n/{}\npolicy=\n{}\n{}\n{}",
            bucket_name,
            canonical_headers,
            Self::SIGNED_HEADERS,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            Self::ALGORITHM,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = self.signature(&date_stamp, &string_to_sign)?;
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            Self::ALGORITHM,
            self.access_key,
            credential_scope,
            Self::SIGNED_HEADERS,
            signature
        );

        Ok(SignedRequest {
            amz_date,
            payload_hash,
            authorization,
        })
    }

    fn signature(&self, date_stamp: &str, string_to_sign: &str) -> Result<String> {
        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, b"s3")?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;

        Ok(hex::encode(hmac_sha256(
            &k_signing,
            string_to_sign.as_bytes(),
        )?))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_image_key_layout() {
        let id = Uuid::parse_str("8f14e45f-ceea-467f-a0f6-d6e1b8a1c2b3").unwrap();
        assert_eq!(
            report_image_key("public", 17, id, "jpg"),
            "public/reports/17_8f14e45f-ceea-467f-a0f6-d6e1b8a1c2b3.jpg"
        );
    }

    #[test]
    fn test_public_read_policy_scopes_prefix() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("report-images", "public")).unwrap();
        assert_eq!(
            policy["Statement"][0]["Resource"][0],
            "arn:aws:s3:::report-images/public/*"
        );
        assert_eq!(policy["Statement"][0]["Action"][0], "s3:GetObject");
    }

    #[test]
    fn test_sigv4_signing_key_derivation() {
        // Signing-key example from the AWS SigV4 documentation
        let signer = SigV4 {
            access_key: "AKIDEXAMPLE",
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            region: "us-east-1",
        };
        let k_date = hmac_sha256(
            format!("AWS4{}", signer.secret_key).as_bytes(),
            b"20150830",
        )
        .unwrap();
        let k_region = hmac_sha256(&k_date, b"us-east-1").unwrap();
        let k_service = hmac_sha256(&k_region, b"iam").unwrap();
        let k_signing = hmac_sha256(&k_service, b"aws4_request").unwrap();
        assert_eq!(
            hex::encode(k_signing),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_sign_put_policy_known_signature() {
        let signer = SigV4 {
            access_key: "minioadmin",
            secret_key: "minioadmin",
            region: "us-east-1",
        };
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let signed = signer
            .sign_put_policy("report-images", "localhost:9000", "{}", now)
            .unwrap();

        assert_eq!(signed.amz_date, "20250102T030405Z");
        assert_eq!(
            signed.payload_hash,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 \
             Credential=minioadmin/20250102/us-east-1/s3/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, \
             Signature=1f4ac1f3ab4fa97a7d9d380d578279974b3fc5ce1820ae6597a26e692e918099"
        );

        let other_host = signer
            .sign_put_policy("report-images", "minio:9000", "{}", now)
            .unwrap();
        assert_ne!(other_host.authorization, signed.authorization);
    }
}
