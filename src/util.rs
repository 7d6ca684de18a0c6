use crate::config::Hashing;
use crate::error::{IngestError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    Ok(std::fs::create_dir_all(p)?)
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Content fingerprint stored as `source_sha256` and consulted by
/// `batch.dedupe_by_content`.
///
/// `full_sha256` digests the whole file. `fast_2x16mb` digests the first and
/// last `fast_window_bytes` plus the file size, so renamed copies of a scan
/// still match without reading large files end to end.
pub fn hash_file(cfg: &Hashing, path: &Path) -> Result<String> {
    let mut f = File::open(path)?;
    let size = f.metadata()?.len();

    match cfg.mode.as_str() {
        "full_sha256" => {
            let mut h = Sha256::new();
            let mut buf = vec![0u8; 1024 * 1024];
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                h.update(&buf[..n]);
            }
            Ok(format!("{:x}", h.finalize()))
        }
        "fast_2x16mb" => {
            let w = cfg.fast_window_bytes.min(size);
            let mut h = Sha256::new();

            if w > 0 {
                f.seek(SeekFrom::Start(0))?;
                let mut buf = vec![0u8; w as usize];
                f.read_exact(&mut buf)?;
                h.update(&buf);

                if size > w {
                    f.seek(SeekFrom::Start(size - w))?;
                    let mut buf2 = vec![0u8; w as usize];
                    f.read_exact(&mut buf2)?;
                    h.update(&buf2);
                }
            }

            h.update(size.to_le_bytes());
            Ok(format!("{:x}", h.finalize()))
        }
        other => Err(IngestError::Config(format!("unknown hashing.mode: {other}"))),
    }
}

/// Stable identity of a source folder, used to scope the checkpoint.
pub fn folder_identity(folder: &Path) -> Result<String> {
    Ok(folder.canonicalize()?.display().to_string())
}

/// `1h02m03s`, `4m05s`, `7s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(7)), "7s");
        assert_eq!(format_duration(Duration::from_secs(245)), "4m05s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h02m03s");
    }

    #[test]
    fn hash_modes_agree_on_identity() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, b"%PDF-1.4 same").unwrap();
        std::fs::write(&b, b"%PDF-1.4 same").unwrap();

        let fast = Hashing::default();
        assert_eq!(hash_file(&fast, &a).unwrap(), hash_file(&fast, &b).unwrap());

        let full = Hashing {
            mode: "full_sha256".into(),
            ..Hashing::default()
        };
        assert_eq!(hash_file(&full, &a).unwrap().len(), 64);

        let bogus = Hashing {
            mode: "md5".into(),
            ..Hashing::default()
        };
        assert!(hash_file(&bogus, &a).is_err());
    }
}
