//! Fake yt-dlp built from shell scripts
//!
//! Scripts run through `sh <script>` so nothing needs the executable bit. Each
//! script records its arguments next to itself, refuses to run without
//! `--cookies`, and exposes the URL (last argument) as `$last`.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use reeldrop::download::YtDlpFetcher;

const PROLOGUE: &str = r#"
for last; do :; done
cookies=""
out=""
prev=""
for arg; do
  if [ "$prev" = "--cookies" ]; then cookies="$arg"; fi
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
echo "$@" > "$0.args"
if [ -z "$cookies" ]; then
  echo "ERROR: missing --cookies" >&2
  exit 3
fi
"#;

/// Probe output echoing the requested URL into the title
pub const PROBE_OK: &str = r#"
cat <<EOF
{"title":"clip for $last","duration":12.4,"uploader":"tester","thumbnail":"https://cdn.example.com/t.jpg","webpage_url":"$last"}
EOF
"#;

pub const PROBE_FAIL: &str = r#"
echo "ERROR: [TikTok] 7301: Video unavailable" >&2
exit 1
"#;

pub const PROBE_BAD_JSON: &str = r#"
echo "this is not json"
"#;

pub const STREAM_OK: &str = r#"
echo "[TikTok] Extracting URL: $last" >&2
echo "[download]  50.0% of 1.00KiB at 1.00KiB/s ETA 00:01" >&2
printf 'FAKEVIDEOBYTES'
echo "[download] 100.0% of 1.00KiB at 1.00KiB/s ETA 00:00" >&2
"#;

pub const STREAM_FAIL: &str = r#"
printf 'PARTIAL'
echo "ERROR: connection reset" >&2
exit 1
"#;

/// Writes a little, then stalls; `$0.finished` only appears if it is not killed
pub const STREAM_SLOW: &str = r#"
printf 'HEAD'
sleep 1
touch "$0.finished"
printf 'TAIL'
"#;

/// Fills the `-o` template and announces the destination like yt-dlp does
pub const FILE_OK: &str = r#"
dest=$(printf '%s' "$out" | sed 's/%(title)s/fake clip/; s/%(ext)s/mp4/')
echo "[download] Destination: $dest"
printf 'data' > "$dest"
echo "[download] 100.0% of 4.00B at 4.00B/s ETA 00:00"
"#;

/// Names the file after the last path segment of the URL and writes that id into it
pub const FILE_TITLED_BY_URL: &str = r#"
id=$(basename "$last")
dest=$(printf '%s' "$out" | sed "s/%(title)s/clip $id/; s/%(ext)s/mp4/")
echo "[download] Destination: $dest"
printf '%s' "$id" > "$dest"
"#;

/// Announces a destination, then stalls; `$0.finished` only appears if it is not killed
pub const FILE_SLOW: &str = r#"
dest=$(printf '%s' "$out" | sed 's/%(title)s/slow clip/; s/%(ext)s/mp4/')
echo "[download] Destination: $dest"
sleep 1
touch "$0.finished"
printf 'data' > "$dest"
"#;

/// Keeps printing on both pipes until it is killed
pub const FILE_CHATTY: &str = r#"
while :; do
  echo "[TikTok] still extracting" >&2
  echo "[download]   1.0% of 1.00MiB at 1.00KiB/s ETA 10:00"
done
"#;

pub const FILE_NO_DESTINATION: &str = r#"
echo "[download] finished without saying where"
exit 0
"#;

pub const FILE_FAIL_WITH_DESTINATION: &str = r#"
echo "[download] Destination: /tmp/never-used.mp4"
echo "ERROR: Postprocessing: Conversion failed!" >&2
exit 2
"#;

/// A temp dir holding one fake downloader script and a cookies file
pub struct FakeDownloader {
    dir: TempDir,
    script: PathBuf,
    cookies: PathBuf,
}

impl FakeDownloader {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n{}", PROLOGUE, body)).unwrap();
        let cookies = dir.path().join("cookies.txt");
        std::fs::write(&cookies, "# Netscape HTTP Cookie File\n").unwrap();
        Self { dir, script, cookies }
    }

    pub fn fetcher(&self) -> YtDlpFetcher {
        YtDlpFetcher::new("sh", &self.cookies).with_leading_args(vec![self.script.to_string_lossy().into_owned()])
    }

    /// Value for `YTDL_BIN` that runs this script
    pub fn ytdl_bin(&self) -> String {
        format!("sh {}", self.script.display())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cookies(&self) -> &Path {
        &self.cookies
    }

    /// Arguments of the last invocation, as the script saw them
    pub fn recorded_args(&self) -> String {
        std::fs::read_to_string(self.script.with_extension("sh.args")).unwrap_or_default()
    }

    /// True when a slow script ran to completion
    pub fn finished_marker_exists(&self) -> bool {
        self.script.with_extension("sh.finished").exists()
    }
}
