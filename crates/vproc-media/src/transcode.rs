//! Rendition transcode command.

use std::path::Path;

use vproc_models::Rendition;

use crate::command::FfmpegCommand;

/// Video codec for every rendition.
pub const RENDITION_VIDEO_CODEC: &str = "libx264";
/// Audio codec for every rendition.
pub const RENDITION_AUDIO_CODEC: &str = "aac";
/// Audio bitrate for every rendition.
pub const RENDITION_AUDIO_BITRATE: &str = "128k";

/// Build the command producing one MP4 rendition.
///
/// Only the first video stream is kept, scaled to the target height with the
/// width rounded to even. The first audio stream is re-encoded when present.
pub fn transcode_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    rendition: Rendition,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .input_option("-fflags", "+genpts")
        .map("0:v:0")
        .video_codec(RENDITION_VIDEO_CODEC)
        .crf(rendition.crf)
        .scale_to_height(rendition.height)
        .map("0:a?")
        .audio_codec(RENDITION_AUDIO_CODEC)
        .audio_bitrate(RENDITION_AUDIO_BITRATE)
        .container("mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(args: &[String], flag: &str) -> Vec<String> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].clone())
            .collect()
    }

    #[test]
    fn test_transcode_arguments() {
        let cmd = transcode_command(
            "/tmp/in.mov",
            "/tmp/out_480.mp4",
            Rendition { height: 480, crf: 20 },
        );
        let args = cmd.build_args();

        assert_eq!(pair(&args, "-map"), vec!["0:v:0", "0:a?"]);
        assert_eq!(pair(&args, "-c:v"), vec!["libx264"]);
        assert_eq!(pair(&args, "-crf"), vec!["20"]);
        assert_eq!(pair(&args, "-vf"), vec!["scale=-2:480"]);
        assert_eq!(pair(&args, "-c:a"), vec!["aac"]);
        assert_eq!(pair(&args, "-b:a"), vec!["128k"]);
        assert_eq!(pair(&args, "-fflags"), vec!["+genpts"]);
        assert_eq!(pair(&args, "-f"), vec!["mp4"]);
        assert_eq!(args.last().unwrap(), "/tmp/out_480.mp4");
    }
}
