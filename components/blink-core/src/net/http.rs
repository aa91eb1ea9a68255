#![allow(async_fn_in_trait)]

use embedded_io_async::Read;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransportError {
    Dns,
    Connect,
    Tls,
    Request,
    Io,
    BodyTooLarge,
    /// The transport cannot honour the requested configuration.
    Unsupported,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TransportError::Dns => defmt::write!(f, "Dns"),
            TransportError::Connect => defmt::write!(f, "Connect"),
            TransportError::Tls => defmt::write!(f, "Tls"),
            TransportError::Request => defmt::write!(f, "Request"),
            TransportError::Io => defmt::write!(f, "Io"),
            TransportError::BodyTooLarge => defmt::write!(f, "BodyTooLarge"),
            TransportError::Unsupported => defmt::write!(f, "Unsupported"),
        }
    }
}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            TransportError::Dns => embedded_io_async::ErrorKind::NotFound,
            TransportError::Connect => embedded_io_async::ErrorKind::NotConnected,
            TransportError::Tls => embedded_io_async::ErrorKind::InvalidData,
            TransportError::Request => embedded_io_async::ErrorKind::Other,
            TransportError::Io => embedded_io_async::ErrorKind::Other,
            TransportError::BodyTooLarge => embedded_io_async::ErrorKind::OutOfMemory,
            TransportError::Unsupported => embedded_io_async::ErrorKind::Unsupported,
        }
    }
}

pub type HttpStatusCode = u16;

pub const HTTP_OK: HttpStatusCode = 200;

pub struct HttpResponse<B: Read> {
    status: HttpStatusCode,
    body: B,
}

impl<B: Read> HttpResponse<B> {
    pub fn new(status: HttpStatusCode, body: B) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn body(&mut self) -> &mut B {
        &mut self.body
    }
}

/// One request/response exchange over an (encrypted) connection.
pub trait HttpTransport {
    type Body<'a>: Read
    where
        Self: 'a;

    async fn get<'a>(&'a mut self, url: &str) -> Result<HttpResponse<Self::Body<'a>>, TransportError>;
}

/// Reads `body` into `buf` until end of stream.
///
/// Returns the number of bytes read, or `BodyTooLarge` when the stream holds
/// more than `buf` can take.
pub async fn read_to_end<R: Read>(body: &mut R, buf: &mut [u8]) -> Result<usize, TransportError> {
    let mut total_read = 0;
    loop {
        let Some(rest) = buf.get_mut(total_read..) else {
            return Err(TransportError::BodyTooLarge);
        };
        if rest.is_empty() {
            // full; one more byte means the body does not fit
            let mut probe = [0u8; 1];
            return match body.read(&mut probe).await {
                Ok(0) => Ok(total_read),
                Ok(_) => Err(TransportError::BodyTooLarge),
                Err(_) => Err(TransportError::Io),
            };
        }
        match body.read(rest).await {
            Ok(0) => return Ok(total_read),
            Ok(n) => total_read += n,
            Err(_) => return Err(TransportError::Io),
        }
    }
}


#[cfg(test)]
pub mod tests {
    use super::*;

    #[tokio::test]
    async fn read_to_end_fits() {
        let mut body: &[u8] = b"{\"delay\": 3}";
        let mut buf = [0u8; 32];
        let n = read_to_end(&mut body, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"delay\": 3}");
    }

    #[tokio::test]
    async fn read_to_end_exact_fit() {
        let mut body: &[u8] = b"1234";
        let mut buf = [0u8; 4];
        assert_eq!(read_to_end(&mut body, &mut buf).await, Ok(4));
    }

    #[tokio::test]
    async fn read_to_end_overflow() {
        let mut body: &[u8] = b"12345";
        let mut buf = [0u8; 4];
        assert_eq!(read_to_end(&mut body, &mut buf).await, Err(TransportError::BodyTooLarge));
    }
}
