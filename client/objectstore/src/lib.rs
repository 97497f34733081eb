//! S3-compatible object store client: presigned URLs for snapshot upload/download
//! (spec §6 `Qdrant.S3`, §9 "AWS4-HMAC-SHA256").
use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;
use time::OffsetDateTime;

use vigilante_conf::S3Conf;

type HmacSha256 = Hmac<Sha256>;

/// HTTP method a presigned URL is valid for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PresignMethod {
    Get,
    Put,
}

impl PresignMethod {
    fn as_str(self) -> &'static str {
        match self {
            PresignMethod::Get => "GET",
            PresignMethod::Put => "PUT",
        }
    }
}

/// Error presigning a request.
#[derive(Debug, thiserror::Error)]
pub enum PresignError {
    #[error("object key must not be empty")]
    EmptyKey,
    #[error("invalid S3 endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Client for generating SigV4-presigned URLs against an S3-compatible endpoint.
pub struct ObjectStoreClient {
    endpoint_url: String,
    access_key: String,
    secret_key: String,
    region: String,
}

impl ObjectStoreClient {
    pub fn new(conf: &S3Conf) -> Self {
        ObjectStoreClient {
            endpoint_url: conf.endpoint_url.clone(),
            access_key: conf.access_key.clone(),
            secret_key: conf.secret_key.clone(),
            region: conf.region.clone(),
        }
    }

    /// Presign a request to `bucket/key`, valid for `expires_in_seconds` from `now`.
    ///
    /// `now` is taken as a parameter rather than read from the clock so callers (and tests)
    /// control the signed timestamp deterministically.
    pub fn presign(
        &self,
        method: PresignMethod,
        bucket: &str,
        key: &str,
        expires_in_seconds: u64,
        now: OffsetDateTime,
    ) -> Result<String, PresignError> {
        if key.is_empty() {
            return Err(PresignError::EmptyKey);
        }
        let endpoint = url::Url::parse(&self.endpoint_url)?;
        let host = endpoint
            .host_str()
            .map(|host| match endpoint.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
            .unwrap_or_default();
        let path = format!("/{}/{}", bucket, key.trim_start_matches('/'));

        let amz_date = amz_date(now);
        let date_stamp = amz_date_short(now);
        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let credential = format!("{}/{}", self.access_key, credential_scope);

        let mut query: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
            ("X-Amz-Credential".into(), credential),
            ("X-Amz-Date".into(), amz_date.clone()),
            (
                "X-Amz-Expires".into(),
                expires_in_seconds.to_string(),
            ),
            ("X-Amz-SignedHeaders".into(), "host".into()),
        ];
        query.sort_by(|a, b| a.0.cmp(&b.0));
        let canonical_query = canonical_query_string(&query);

        let canonical_request = format!(
            "{method}\n{path}\n{query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD",
            method = method.as_str(),
            path = path,
            query = canonical_query,
            host = host,
        );
        let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date, credential_scope, hashed_request
        );

        let signing_key = self.signing_key(&date_stamp);
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

        let mut url = format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            endpoint.scheme(),
            host,
            path,
            canonical_query,
            signature
        );
        if url.starts_with("https://") || url.starts_with("http://") {
            // no-op, format above already produces a full URL
        } else {
            url = format!("https://{}", url);
        }
        Ok(url)
    }

    fn signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac(&k_date, self.region.as_bytes());
        let k_service = hmac(&k_region, b"s3");
        hmac(&k_service, b"aws4_request")
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn amz_date(now: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn amz_date_short(now: OffsetDateTime) -> String {
    format!("{:04}{:02}{:02}", now.year(), u8::from(now.month()), now.day())
}

fn canonical_query_string(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{}={}", url_encode(key), url_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn url_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn client() -> ObjectStoreClient {
        let conf = S3Conf {
            endpoint_url: "https://s3.example.test".into(),
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "secret".into(),
            region: "default".into(),
        };
        ObjectStoreClient::new(&conf)
    }

    #[test]
    fn presign_is_deterministic_for_fixed_time() {
        let now = datetime!(2024-01-15 10:00:00 UTC);
        let client = client();
        let url_a = client
            .presign(PresignMethod::Get, "snapshots", "docs/a.snapshot", 900, now)
            .unwrap();
        let url_b = client
            .presign(PresignMethod::Get, "snapshots", "docs/a.snapshot", 900, now)
            .unwrap();
        assert_eq!(url_a, url_b);
        assert!(url_a.contains("X-Amz-Signature="));
        assert!(url_a.contains("X-Amz-Expires=900"));
    }

    #[test]
    fn presign_rejects_empty_key() {
        let now = datetime!(2024-01-15 10:00:00 UTC);
        let error = client()
            .presign(PresignMethod::Put, "snapshots", "", 900, now)
            .unwrap_err();
        assert!(matches!(error, PresignError::EmptyKey));
    }
}
