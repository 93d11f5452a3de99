//! Thumbnail extraction: a single JPEG frame pulled from the rendered
//! output, one second in so the frame isn't a pre-roll black flash.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

const THUMBNAIL_SEEK_SEC: f64 = 1.0;
const THUMBNAIL_QUALITY: u8 = 2;

pub async fn generate_thumbnail(input: impl AsRef<Path>, output: impl AsRef<Path>) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(input, output)
        .seek(THUMBNAIL_SEEK_SEC)
        .single_frame()
        .quality(THUMBNAIL_QUALITY);
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuildArgs;

    #[test]
    fn thumbnail_command_seeks_and_takes_one_frame() {
        let cmd = FfmpegCommand::new("in.mp4", "thumb.jpg")
            .seek(THUMBNAIL_SEEK_SEC)
            .single_frame()
            .quality(THUMBNAIL_QUALITY);
        let args = cmd.build_args();
        assert!(args.contains(&"-vframes".to_string()));
        assert!(args.contains(&"1.000".to_string()));
    }
}
