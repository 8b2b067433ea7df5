//! HTML document decoding.
//!
//! The body is consumed chunk by chunk. With a target encoding it goes through
//! a streaming `encoding_rs` decoder into UTF-8; without one the raw bytes are
//! read as UTF-8. Either way malformed sequences become U+FFFD, so only a
//! failure to read the body rejects a page. The text is parsed with `scraper`.

use crate::{
    transport::{read_to_end, ResponseBody},
    Error, Result,
};
use encoding_rs::{CoderResult, Decoder, Encoding};
use scraper::Html;

/// A parsed HTML document.
#[derive(Debug)]
pub struct Document {
    /// The parsed tree, queryable with `scraper::Selector`.
    pub html: Html,

    /// The encoding the body was transcoded from, if transcoding ran.
    pub transcoded_from: Option<&'static Encoding>,
}

impl Document {
    /// Returns the parsed tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Consumes the document and returns the parsed tree.
    pub fn into_html(self) -> Html {
        self.html
    }
}

/// Reads `body` to the end and parses it as HTML.
///
/// The body is released before this returns, whatever the outcome. Any
/// non-empty target encoding enables transcoding, UTF-8 included.
pub(crate) async fn decode<B: ResponseBody>(
    body: B,
    target_encoding: Option<&'static Encoding>,
) -> Result<Document> {
    let text = match target_encoding {
        Some(encoding) => transcode(body, encoding).await?,
        None => {
            let bytes = read_to_end(body).await.map_err(read_failure)?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };

    Ok(Document {
        html: Html::parse_document(&text),
        transcoded_from: target_encoding,
    })
}

async fn transcode<B: ResponseBody>(mut body: B, encoding: &'static Encoding) -> Result<String> {
    tracing::debug!(encoding = encoding.name(), "Transcoding response body");

    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut text = String::new();
    while let Some(chunk) = body.chunk().await.map_err(read_failure)? {
        decode_chunk(&mut decoder, &chunk, &mut text, false);
    }
    decode_chunk(&mut decoder, &[], &mut text, true);
    Ok(text)
}

fn decode_chunk(decoder: &mut Decoder, mut input: &[u8], out: &mut String, last: bool) {
    loop {
        let needed = decoder
            .max_utf8_buffer_length(input.len())
            .unwrap_or(input.len().saturating_mul(3).saturating_add(16));
        out.reserve(needed);

        let (result, read, _) = decoder.decode_to_string(input, out, last);
        input = &input[read..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => continue,
        }
    }
}

// Timeouts keep their kind so callers can tell a slow server from bad data.
fn read_failure(error: Error) -> Error {
    if error.is_timeout() {
        error
    } else {
        Error::MalformedDocument(format!("failed to read body: {}", error))
    }
}
