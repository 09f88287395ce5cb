use super::ObjectStore;
use crate::error::{RepoCryptError, Result};
use crate::settings::S3Settings;
use s3::{bucket::Bucket, creds::Credentials, region::Region};
use tracing::debug;

/// Object store under `<scope>/` in an S3 bucket.
pub struct S3Store {
    bucket: Box<Bucket>,
    scope: String,
}

impl S3Store {
    pub fn new(cfg: &S3Settings) -> Result<Self> {
        if cfg.bucket.is_empty() {
            return Err(RepoCryptError::Other("remote.s3.bucket is empty".into()));
        }

        let bucket = Bucket::new(cfg.bucket.as_str(), region(cfg)?, credentials(cfg)?)
            .map_err(|err| RepoCryptError::Remote(format!("S3 bucket error: {err}")))?;
        let bucket = if cfg.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            scope: cfg.scope.trim_matches('/').to_string(),
        })
    }

    fn remote_path(&self, path: &str) -> String {
        remote_path(&self.scope, path)
    }
}

fn remote_path(scope: &str, path: &str) -> String {
    if scope.is_empty() {
        path.to_string()
    } else {
        format!("{scope}/{path}")
    }
}

fn region(cfg: &S3Settings) -> Result<Region> {
    match (&cfg.endpoint, cfg.region.as_deref()) {
        (Some(endpoint), Some(region_name)) => Ok(Region::Custom {
            region: region_name.to_string(),
            endpoint: endpoint.to_string(),
        }),
        (Some(endpoint), None) => Ok(Region::Custom {
            region: "custom".into(),
            endpoint: endpoint.to_string(),
        }),
        (None, Some(region)) => region
            .parse()
            .map_err(|_| RepoCryptError::Other(format!("Invalid region: {region}"))),
        (None, None) => Ok(Region::UsEast1),
    }
}

fn credentials(cfg: &S3Settings) -> Result<Credentials> {
    Credentials::new(
        cfg.access_key.as_deref(),
        cfg.secret_key.as_deref(),
        None,
        None,
        None,
    )
    .map_err(|err| RepoCryptError::Remote(format!("S3 credentials error: {err}")))
}

impl ObjectStore for S3Store {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let remote_path = self.remote_path(path);
        let response = self
            .bucket
            .get_object_blocking(remote_path.as_str())
            .map_err(|err| RepoCryptError::Remote(format!("Failed to fetch {remote_path}: {err}")))?;

        match response.status_code() {
            200..=299 => Ok(Some(response.bytes().to_vec())),
            404 => Ok(None),
            code => Err(RepoCryptError::Remote(format!(
                "Fetching {remote_path} returned HTTP {code}"
            ))),
        }
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let remote_path = self.remote_path(path);
        let response = self
            .bucket
            .put_object_blocking(remote_path.as_str(), bytes)
            .map_err(|err| RepoCryptError::Remote(format!("Failed to upload to S3: {err}")))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(RepoCryptError::Remote(format!(
                "Uploading {remote_path} returned HTTP {}",
                response.status_code()
            )));
        }
        debug!(bucket = %self.bucket.name(), %remote_path, "uploaded object");
        Ok(())
    }
}
