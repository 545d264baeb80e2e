use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

const SYSTEM_EXECUTABLES: [&str; 5] = [
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

const SYSTEM_TESSDATA_DIRS: [&str; 6] = [
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
];

/// Locations of the Tesseract executable and the directory holding the
/// requested language data.
#[derive(Clone, Debug)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing downloaded Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("equipment-ocr")
        .join("tesseract")
}

fn traineddata_file(language_id: &str) -> String {
    format!("{}.traineddata", language_id)
}

/// Ensures the Tesseract executable and `<language_id>.traineddata` are
/// available. Missing language data is downloaded into the local data dir.
pub fn ensure_tesseract(language_id: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    log(&format!("Tesseract executable: {}", executable.display()));

    let local_tessdata = get_tesseract_dir().join("tessdata");
    let tessdata = match find_tessdata_dir(language_id, &tessdata_candidates(&local_tessdata)) {
        Some(dir) => dir,
        None => {
            log(&format!(
                "{} not found locally, downloading...",
                traineddata_file(language_id)
            ));
            download_tessdata(&local_tessdata, language_id)?;
            local_tessdata
        }
    };

    log(&format!("Tesseract data ready at: {}", tessdata.display()));
    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then PATH,
/// then common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let exe_name = if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    };
    let local_exe = get_tesseract_dir().join(exe_name);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    SYSTEM_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow!(
                "Tesseract not found. Install Tesseract-OCR and add it to PATH, or copy it to: {}",
                get_tesseract_dir().display()
            )
        })
}

/// Directories searched for language data, in priority order.
fn tessdata_candidates(local_tessdata: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![local_tessdata.to_path_buf()];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));
    candidates
}

/// Returns the first candidate directory containing `<language_id>.traineddata`.
pub fn find_tessdata_dir(language_id: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    let file = traineddata_file(language_id);
    candidates.iter().find(|dir| dir.join(&file).exists()).cloned()
}

/// Downloads `<language_id>.traineddata` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language_id: &str) -> Result<()> {
    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    let file = traineddata_file(language_id);
    let url = format!("{}/{}", TESSDATA_REPO, file);

    log(&format!("Downloading {}...", url));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "equipment-ocr")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    write_complete_file(tessdata_dir, &file, &bytes)?;

    log(&format!("Downloaded {} ({} bytes)", file, bytes.len()));

    Ok(())
}

/// Writes `bytes` to a temporary file in `dir` and renames it to `file_name`,
/// so an interrupted write never leaves a partial file under the final name.
fn write_complete_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_tessdata_dir_in_priority_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(second.path().join("kor.traineddata"), b"data").unwrap();
        fs::write(first.path().join("eng.traineddata"), b"data").unwrap();
        fs::write(second.path().join("eng.traineddata"), b"data").unwrap();

        let candidates = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_tessdata_dir("eng", &candidates),
            Some(first.path().to_path_buf())
        );
        assert_eq!(
            find_tessdata_dir("kor", &candidates),
            Some(second.path().to_path_buf())
        );
        assert_eq!(find_tessdata_dir("jpn", &candidates), None);
    }

    #[test]
    fn test_write_complete_file_leaves_only_final_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("eng.traineddata"), b"trunc").unwrap();

        let path = write_complete_file(dir.path(), "eng.traineddata", b"complete data").unwrap();

        assert_eq!(path, dir.path().join("eng.traineddata"));
        assert_eq!(fs::read(&path).unwrap(), b"complete data");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_complete_file_into_missing_dir_fails_cleanly() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(write_complete_file(&missing, "eng.traineddata", b"data").is_err());
        assert!(find_tessdata_dir("eng", &[missing]).is_none());
    }

    #[test]
    fn test_local_dir_is_searched_first() {
        let local = PathBuf::from("local-tessdata");
        let candidates = tessdata_candidates(&local);
        assert_eq!(candidates[0], local);
        assert!(candidates.len() > SYSTEM_TESSDATA_DIRS.len());
    }
}
