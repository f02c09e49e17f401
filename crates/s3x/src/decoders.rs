//! 🔄 Decoders: what happens to bytes between the download and the matcher.
//!
//! Most objects go straight through (`Plain`). Objects whose key ends in
//! `.gz` can optionally be inflated on the fly (`Gzip`), so `ERROR500` is
//! searched in the log text rather than in the deflate soup. 🫁
//!
//! 🧠 Knowledge graph:
//! - one decoder per object per attempt, owned by a single match worker
//! - `Gzip` wraps the matcher in a `Write` adapter and lets `flate2` push
//!   decompressed bytes into it; memory stays at one window + flate2's buffers
//! - concatenated members (`cat a.gz b.gz`, rotated logs) decode as one stream
//! - a corrupt gzip stream is an object-scope failure, same bucket as a failed fetch

use std::io::{self, Write};

use anyhow::{Context, Result};
use flate2::write::MultiGzDecoder;

use crate::matcher::{MatchState, StreamMatcher};

/// ✍️ `io::Write` face for a matcher, so a decompressor can write straight into it.
#[derive(Debug)]
pub(crate) struct MatcherWriter {
    matcher: StreamMatcher,
}

impl Write for MatcherWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // -- 🗑️ after a terminal state the matcher swallows bytes without looking
        self.matcher.feed(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 🎭 Plain or inflated, the matcher doesn't need to know which.
#[derive(Debug)]
pub(crate) enum ContentDecoder {
    Plain(StreamMatcher),
    Gzip(Box<MultiGzDecoder<MatcherWriter>>),
}

impl ContentDecoder {
    /// 🏗️ Pick the decoder for `key`. Gzip only when enabled AND the key says `.gz`.
    pub(crate) fn for_object(key: &str, matcher: StreamMatcher, decompress_gzip: bool) -> Self {
        if decompress_gzip && key.ends_with(".gz") {
            ContentDecoder::Gzip(Box::new(MultiGzDecoder::new(MatcherWriter { matcher })))
        } else {
            ContentDecoder::Plain(matcher)
        }
    }

    /// 📥 Push one downloaded chunk through, returning the matcher's state afterwards.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<MatchState> {
        match self {
            ContentDecoder::Plain(matcher) => Ok(matcher.feed(chunk)),
            ContentDecoder::Gzip(decoder) => {
                decoder
                    .write_all(chunk)
                    .context("💀 gzip stream is corrupt, the deflate goblins ate it")?;
                Ok(decoder.get_ref().matcher.state())
            }
        }
    }

    /// 🏁 End of stream. Flushes the decompressor and settles the verdict.
    pub(crate) fn finish(self) -> Result<MatchState> {
        match self {
            ContentDecoder::Plain(mut matcher) => Ok(matcher.finish()),
            ContentDecoder::Gzip(decoder) => {
                let MatcherWriter { mut matcher } = decoder
                    .finish()
                    .context("💀 gzip stream ended mid-sentence, truncated or not gzip at all")?;
                Ok(matcher.finish())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("💀 compressing into a Vec cannot fail");
        encoder.finish().expect("💀 finishing into a Vec cannot fail")
    }

    fn matcher() -> StreamMatcher {
        StreamMatcher::new(b"ERROR500").expect("💀 valid pattern")
    }

    #[test]
    fn the_one_where_gzip_logs_get_inflated_before_judgement() -> Result<()> {
        let compressed = gzip(b"line one\nline two ERROR500\nline three\n");
        let mut decoder = ContentDecoder::for_object("app.log.gz", matcher(), true);
        assert!(matches!(decoder, ContentDecoder::Gzip(_)));

        let mut state = MatchState::Accumulating;
        for chunk in compressed.chunks(5) {
            state = decoder.push(chunk)?;
            if state.is_terminal() {
                break;
            }
        }
        assert_eq!(state, MatchState::Matched);
        Ok(())
    }

    #[test]
    fn the_one_where_the_needle_hides_in_the_second_gzip_member() -> Result<()> {
        let mut rotated = gzip(b"first member, all quiet\n");
        rotated.extend(gzip(b"second member ERROR500\n"));
        let mut decoder = ContentDecoder::for_object("rotated.log.gz", matcher(), true);

        let mut state = MatchState::Accumulating;
        for chunk in rotated.chunks(6) {
            state = decoder.push(chunk)?;
            if state.is_terminal() {
                break;
            }
        }
        if !state.is_terminal() {
            state = decoder.finish()?;
        }
        assert_eq!(state, MatchState::Matched);
        Ok(())
    }

    #[test]
    fn the_one_where_two_quiet_members_are_exhausted_not_corrupt() -> Result<()> {
        let mut rotated = gzip(b"monday: fine\n");
        rotated.extend(gzip(b"tuesday: also fine\n"));
        let mut decoder = ContentDecoder::for_object("week.log.gz", matcher(), true);
        decoder.push(&rotated)?;
        assert_eq!(decoder.finish()?, MatchState::Exhausted);
        Ok(())
    }

    #[test]
    fn the_one_where_a_clean_gzip_without_the_needle_is_exhausted() -> Result<()> {
        let compressed = gzip(b"all quiet on the western front\n");
        let mut decoder = ContentDecoder::for_object("quiet.gz", matcher(), true);
        for chunk in compressed.chunks(7) {
            decoder.push(chunk)?;
        }
        assert_eq!(decoder.finish()?, MatchState::Exhausted);
        Ok(())
    }

    #[test]
    fn the_one_where_decompression_is_opt_in() -> Result<()> {
        let compressed = gzip(b"ERROR500");
        let mut decoder = ContentDecoder::for_object("app.log.gz", matcher(), false);
        assert!(matches!(decoder, ContentDecoder::Plain(_)));
        decoder.push(&compressed)?;
        assert_eq!(decoder.finish()?, MatchState::Exhausted);

        let plain = ContentDecoder::for_object("app.log", matcher(), true);
        assert!(matches!(plain, ContentDecoder::Plain(_)));
        Ok(())
    }

    #[test]
    fn the_one_where_garbage_with_a_gz_suffix_is_an_error() {
        let mut decoder = ContentDecoder::for_object("fake.gz", matcher(), true);
        let pushed = decoder.push(b"this was never gzip, it just wanted to belong");
        let outcome = pushed.and_then(|_| decoder.finish());
        assert!(outcome.is_err(), "💀 garbage was decoded into a verdict");
    }
}
