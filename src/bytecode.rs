use crate::{
    error::Error,
    scanner::Scanner,
    source::Position,
    token::{Token, TokenStream, TokenType},
};
use rsa::{traits::PublicKeyParts, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error as ThisError;

/// 4-byte magic at the head of a signed token stream.
pub const HEADER_MAGIC: &[u8; 4] = b"STOK";

/// Failures at the codec layer: these have no source position, unlike the
/// compile and evaluation errors flowing through `Error`.
#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error(transparent)]
    Compile(#[from] Error),
    #[error("literal too long")]
    LiteralTooLong,
    #[error("token data length {0} exceeds maximum allowed size")]
    StreamTooLong(usize),
    #[error("signing failed: {0}")]
    Signing(rsa::Error),
    #[error("data too short to contain valid signed tokens")]
    TooShort,
    #[error("invalid header magic; expected STOK")]
    BadMagic,
    #[error("data length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid signature: {0}")]
    InvalidSignature(rsa::Error),
}

/// Scans `source` and serializes its token stream: one type-code byte per
/// token, plus a length-prefixed literal for tokens without a fixed form.
/// The stream ends with an `Eof` record.
pub fn export_tokens(source: &str) -> Result<Vec<u8>, CodecError> {
    let mut scanner = Scanner::new(source);
    let mut buf = Vec::new();
    loop {
        let token = scanner.next_token()?;
        encode_token(&token, &mut buf)?;
        if token.token_type == TokenType::Eof {
            return Ok(buf);
        }
    }
}

/// Like `export_tokens`, wrapping the stream in the signed layout:
/// magic, little-endian u32 length, token stream, then an RSA PKCS#1 v1.5
/// signature over the stream's SHA-256 digest.
pub fn export_tokens_signed(
    source: &str,
    private_key: &RsaPrivateKey,
) -> Result<Vec<u8>, CodecError> {
    let token_data = export_tokens(source)?;
    if token_data.len() > u32::MAX as usize {
        return Err(CodecError::StreamTooLong(token_data.len()));
    }
    let digest = Sha256::digest(&token_data);
    let signature = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), digest.as_slice())
        .map_err(CodecError::Signing)?;

    let mut buf =
        Vec::with_capacity(HEADER_MAGIC.len() + 4 + token_data.len() + signature.len());
    buf.extend_from_slice(HEADER_MAGIC);
    buf.extend_from_slice(&(token_data.len() as u32).to_le_bytes());
    buf.extend_from_slice(&token_data);
    buf.extend_from_slice(&signature);
    Ok(buf)
}

fn encode_token(token: &Token, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    buf.push(token.token_type.into());
    if token
        .token_type
        .fixed_literal()
        .map_or(false, |fixed| fixed == token.literal)
    {
        return Ok(());
    }
    let bytes = token.literal.as_bytes();
    if bytes.len() > 255 {
        return Err(CodecError::LiteralTooLong);
    }
    buf.push(bytes.len() as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Decodes a serialized token stream. Positions are not preserved by the
/// format, so every decoded token carries `(-1, -1)`.
#[derive(Debug)]
pub struct ByteCodeReader {
    data: Vec<u8>,
    pos: usize,
}

impl ByteCodeReader {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Validates the signed wrapper (magic, length, total size) and
    /// verifies the signature before any token can be read.
    pub fn from_signed(data: &[u8], public_key: &RsaPublicKey) -> Result<Self, CodecError> {
        let sig_size = public_key.size();
        if data.len() < HEADER_MAGIC.len() + 4 + sig_size {
            return Err(CodecError::TooShort);
        }
        if &data[..HEADER_MAGIC.len()] != HEADER_MAGIC {
            return Err(CodecError::BadMagic);
        }
        let mut pos = HEADER_MAGIC.len();
        let length_bytes: [u8; 4] = data[pos..pos + 4]
            .try_into()
            .map_err(|_| CodecError::TooShort)?;
        let token_len = u32::from_le_bytes(length_bytes) as usize;
        pos += 4;

        let expected = HEADER_MAGIC.len() + 4 + token_len + sig_size;
        if data.len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        let token_data = &data[pos..pos + token_len];
        let signature = &data[pos + token_len..];

        let digest = Sha256::digest(token_data);
        public_key
            .verify(Pkcs1v15Sign::new::<Sha256>(), digest.as_slice(), signature)
            .map_err(CodecError::InvalidSignature)?;

        Ok(Self::new(token_data))
    }
}

impl TokenStream for ByteCodeReader {
    fn next_token(&mut self) -> Result<Token, Error> {
        if self.pos >= self.data.len() {
            return Ok(Token::new(TokenType::Eof, String::new(), Position::UNKNOWN));
        }
        let code = self.data[self.pos];
        self.pos += 1;
        let token_type = TokenType::try_from(code).map_err(|_| {
            Error::lexical(
                format!("unknown token type code: {}", code),
                Position::UNKNOWN,
            )
        })?;

        let literal = match token_type.fixed_literal() {
            Some(fixed) => fixed.to_string(),
            None => {
                if self.pos >= self.data.len() {
                    return Err(Error::lexical(
                        "unexpected end of data reading literal length",
                        Position::UNKNOWN,
                    ));
                }
                let length = self.data[self.pos] as usize;
                self.pos += 1;
                if self.pos + length > self.data.len() {
                    return Err(Error::lexical(
                        "unexpected end of data reading literal",
                        Position::UNKNOWN,
                    ));
                }
                let literal =
                    String::from_utf8_lossy(&self.data[self.pos..self.pos + length]).into_owned();
                self.pos += length;
                literal
            }
        };
        Ok(Token::new(token_type, literal, Position::UNKNOWN))
    }
}
