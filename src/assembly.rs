use crate::config::MissingFragment;
use crate::dispatcher::{FragmentOutcome, FragmentResult};
use crate::error::{PodgenError, PodgenResult};
use crate::fetch;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

const SAMPLE_RATE: u32 = 44100;

/// One input of the final audio concat.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioInput {
    File(PathBuf),
    /// Generated silence of the given length in seconds.
    Silence(f64),
}

/// Files written for one podcast, named after the slugified title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub fragments: PathBuf,
    pub audio: PathBuf,
    pub cover: PathBuf,
    pub video: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, title: &str) -> Self {
        let slug = slugify(title);
        Self {
            fragments: output_dir.join(format!("{slug}-fragments")),
            audio: output_dir.join(format!("{slug}.mp3")),
            cover: output_dir.join(format!("{slug}.png")),
            video: output_dir.join(format!("{slug}.mp4")),
        }
    }
}

/// Lowercase ASCII slug for file names. Falls back to "podcast".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "podcast".into()
    } else {
        slug.to_string()
    }
}

/// Turn dispatch results into concat inputs, applying the missing-fragment policy.
///
/// `results` must already be in segment order.
pub fn plan_inputs(
    results: &[FragmentResult],
    policy: MissingFragment,
    silence_secs: f64,
) -> Vec<AudioInput> {
    results
        .iter()
        .filter_map(|result| match (&result.outcome, policy) {
            (FragmentOutcome::Rendered(path), _) => Some(AudioInput::File(path.clone())),
            (FragmentOutcome::Failed(reason), MissingFragment::Skip) => {
                warn!("Skipping fragment {}: {reason}", result.index);
                None
            }
            (FragmentOutcome::Failed(reason), MissingFragment::Silence) => {
                warn!(
                    "Fragment {} replaced by {silence_secs}s of silence: {reason}",
                    result.index
                );
                Some(AudioInput::Silence(silence_secs))
            }
        })
        .collect()
}

/// Prepend the intro watermark and its trailing gap, when an intro is configured.
pub fn with_intro(intro: Option<&Path>, gap_secs: f64, inputs: Vec<AudioInput>) -> Vec<AudioInput> {
    let Some(intro) = intro else {
        return inputs;
    };
    let mut all = Vec::with_capacity(inputs.len() + 2);
    all.push(AudioInput::File(intro.to_path_buf()));
    if gap_secs > 0.0 {
        all.push(AudioInput::Silence(gap_secs));
    }
    all.extend(inputs);
    all
}

/// Filter graph that normalizes every input and concatenates them into `[aout]`.
fn concat_filter(count: usize) -> String {
    let mut parts: Vec<String> = (0..count)
        .map(|i| {
            format!(
                "[{i}:a]aresample={SAMPLE_RATE},aformat=sample_fmts=fltp:channel_layouts=stereo[a{i}]"
            )
        })
        .collect();
    let labels: String = (0..count).map(|i| format!("[a{i}]")).collect();
    parts.push(format!("{labels}concat=n={count}:v=0:a=1[aout]"));
    parts.join(";")
}

fn concat_args(inputs: &[AudioInput], output_path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into()];
    for input in inputs {
        match input {
            AudioInput::File(path) => {
                args.push("-i".into());
                args.push(path.into());
            }
            AudioInput::Silence(secs) => {
                args.extend(["-f", "lavfi", "-t"].map(OsString::from));
                args.push(format!("{secs:.3}").into());
                args.push("-i".into());
                args.push(format!("anullsrc=r={SAMPLE_RATE}:cl=stereo").into());
            }
        }
    }
    args.push("-filter_complex".into());
    args.push(concat_filter(inputs.len()).into());
    args.extend(["-map", "[aout]", "-c:a", "libmp3lame", "-q:a", "2"].map(OsString::from));
    args.push(output_path.into());
    args
}

/// Concatenate `fragments` (after the optional intro and gap) into one MP3.
pub fn concat_audio(
    intro: Option<&Path>,
    gap_secs: f64,
    fragments: Vec<AudioInput>,
    output_path: &Path,
) -> PodgenResult<()> {
    if fragments.is_empty() {
        return Err(PodgenError::Ffmpeg(
            "no rendered fragments to assemble".into(),
        ));
    }
    let inputs = with_intro(intro, gap_secs, fragments);
    debug!("Concatenating {} audio inputs", inputs.len());

    let mut cmd = Command::new("ffmpeg");
    cmd.args(concat_args(&inputs, output_path));
    run_ffmpeg(cmd, "audio concat")
}

fn mux_args(image: &Path, audio: &Path, output_path: &Path, fps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loop", "1", "-i"].map(OsString::from).to_vec();
    args.push(image.into());
    args.push("-i".into());
    args.push(audio.into());
    args.extend(
        [
            "-c:v",
            "libx264",
            "-tune",
            "stillimage",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-pix_fmt",
            "yuv420p",
            "-r",
        ]
        .map(OsString::from),
    );
    args.push(fps.to_string().into());
    args.extend(["-shortest", "-movflags", "+faststart"].map(OsString::from));
    args.push(output_path.into());
    args
}

/// Mux a still cover image and the podcast audio into an MP4 as long as the audio.
pub fn mux_video(image: &Path, audio: &Path, output_path: &Path, fps: u32) -> PodgenResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(mux_args(image, audio, output_path, fps));
    run_ffmpeg(cmd, "video mux")
}

/// Download the generated cover image, giving up after `timeout`.
pub fn download_cover(url: &str, dest: &Path, timeout: Duration) -> PodgenResult<()> {
    let bytes = fetch::download(&fetch::agent(timeout), url, dest).map_err(PodgenError::Image)?;
    if bytes == 0 {
        return Err(PodgenError::Image(format!("empty image at {url}")));
    }
    debug!("Cover image: {} bytes -> {}", bytes, dest.display());
    Ok(())
}

fn run_ffmpeg(mut cmd: Command, what: &str) -> PodgenResult<()> {
    let output = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| PodgenError::Ffmpeg(format!("Failed to spawn ffmpeg {what}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PodgenError::Ffmpeg(format!(
            "FFmpeg {what} failed: {}",
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(index: usize) -> FragmentResult {
        FragmentResult {
            index,
            outcome: FragmentOutcome::Rendered(PathBuf::from(format!("f/{index}.mp3"))),
        }
    }

    fn failed(index: usize) -> FragmentResult {
        FragmentResult {
            index,
            outcome: FragmentOutcome::Failed("vendor timeout".into()),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fashion Through History"), "fashion-through-history");
        assert_eq!(slugify("  Tea: a history!  "), "tea-a-history");
        assert_eq!(slugify("Café & Crème"), "caf-cr-me");
        assert_eq!(slugify("???"), "podcast");
        assert_eq!(slugify(""), "podcast");
    }

    #[test]
    fn test_output_paths() {
        let paths = OutputPaths::new(Path::new("out"), "History of Tea");
        assert_eq!(paths.audio, PathBuf::from("out/history-of-tea.mp3"));
        assert_eq!(paths.video, PathBuf::from("out/history-of-tea.mp4"));
        assert_eq!(paths.cover, PathBuf::from("out/history-of-tea.png"));
        assert_eq!(paths.fragments, PathBuf::from("out/history-of-tea-fragments"));
    }

    #[test]
    fn test_plan_inputs_skip() {
        let results = vec![rendered(0), failed(2), rendered(3)];
        let inputs = plan_inputs(&results, MissingFragment::Skip, 1.0);
        assert_eq!(
            inputs,
            vec![
                AudioInput::File("f/0.mp3".into()),
                AudioInput::File("f/3.mp3".into()),
            ]
        );
    }

    #[test]
    fn test_plan_inputs_silence() {
        let results = vec![rendered(0), failed(2), rendered(3)];
        let inputs = plan_inputs(&results, MissingFragment::Silence, 1.5);
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[1], AudioInput::Silence(1.5));
    }

    #[test]
    fn test_with_intro() {
        let inputs = vec![AudioInput::File("f/0.mp3".into())];
        let all = with_intro(Some(Path::new("intro.mp3")), 0.5, inputs.clone());
        assert_eq!(
            all,
            vec![
                AudioInput::File("intro.mp3".into()),
                AudioInput::Silence(0.5),
                AudioInput::File("f/0.mp3".into()),
            ]
        );

        assert_eq!(with_intro(None, 0.5, inputs.clone()), inputs);

        let no_gap = with_intro(Some(Path::new("intro.mp3")), 0.0, inputs);
        assert_eq!(no_gap.len(), 2);
    }

    #[test]
    fn test_concat_filter() {
        let filter = concat_filter(2);
        assert_eq!(
            filter,
            "[0:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=stereo[a0];\
             [1:a]aresample=44100,aformat=sample_fmts=fltp:channel_layouts=stereo[a1];\
             [a0][a1]concat=n=2:v=0:a=1[aout]"
        );
    }

    #[test]
    fn test_concat_args_with_silence() {
        let inputs = vec![
            AudioInput::File("intro.mp3".into()),
            AudioInput::Silence(0.5),
            AudioInput::File("f/0.mp3".into()),
        ];
        let args = strings(&concat_args(&inputs, Path::new("out.mp3")));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i intro.mp3 -f lavfi -t 0.500 -i anullsrc=r=44100:cl=stereo -i f/0.mp3"));
        assert!(joined.contains("concat=n=3:v=0:a=1[aout]"));
        assert!(joined.contains("-map [aout] -c:a libmp3lame"));
        assert_eq!(args.last().unwrap(), "out.mp3");
    }

    #[test]
    fn test_concat_audio_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = concat_audio(None, 0.5, vec![], &dir.path().join("out.mp3")).unwrap_err();
        assert!(matches!(err, PodgenError::Ffmpeg(_)));
    }

    #[test]
    fn test_mux_args() {
        let args = strings(&mux_args(
            Path::new("cover.png"),
            Path::new("audio.mp3"),
            Path::new("out.mp4"),
            30,
        ));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -loop 1 -i cover.png -i audio.mp3"));
        assert!(joined.contains("-c:v libx264 -tune stillimage"));
        assert!(joined.contains("-r 30 -shortest"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }
}
