//! Audio track extraction command.

use std::path::Path;

use crate::command::FfmpegCommand;

/// Build the command extracting the audio track as MP3.
pub fn audio_extract_command(input: impl AsRef<Path>, output: impl AsRef<Path>) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .flag("-vn")
        .audio_codec("mp3")
        .container("mp3")
}
