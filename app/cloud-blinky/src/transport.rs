use blink_core::config::BackendConfig;
use blink_core::net::fetcher::MAX_BODY_SIZE;
use blink_core::net::http::{HttpResponse, HttpTransport, TransportError};
use defmt::*;
use embassy_net::Stack;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use embassy_rp::clocks::RoscRng;
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::request::Method;
use static_cell::StaticCell;

const TLS_BUFFER_SIZE: usize = 16640;
const RX_BUFFER_SIZE: usize = 4096;

type Tcp = TcpClientState<1, 1024, 1024>;

/// HTTPS GET over reqwless. Each request opens a fresh TLS session.
pub struct ReqwlessTransport {
    stack: Stack<'static>,
    tcp: &'static Tcp,
    tls_read: &'static mut [u8; TLS_BUFFER_SIZE],
    tls_write: &'static mut [u8; TLS_BUFFER_SIZE],
    rx: &'static mut [u8; RX_BUFFER_SIZE],
    body: heapless::Vec<u8, MAX_BODY_SIZE>,
}

impl ReqwlessTransport {
    pub fn new(stack: Stack<'static>, backend: &BackendConfig) -> Result<Self, TransportError> {
        if backend.verify_server_identity {
            // no CA store on the device
            error!("Server identity verification requested but not supported");
            return Err(TransportError::Unsupported);
        }
        warn!("TLS server identity is NOT verified");

        static TCP: StaticCell<Tcp> = StaticCell::new();
        static TLS_READ: StaticCell<[u8; TLS_BUFFER_SIZE]> = StaticCell::new();
        static TLS_WRITE: StaticCell<[u8; TLS_BUFFER_SIZE]> = StaticCell::new();
        static RX: StaticCell<[u8; RX_BUFFER_SIZE]> = StaticCell::new();

        Ok(Self {
            stack,
            tcp: TCP.init(TcpClientState::new()),
            tls_read: TLS_READ.init([0; TLS_BUFFER_SIZE]),
            tls_write: TLS_WRITE.init([0; TLS_BUFFER_SIZE]),
            rx: RX.init([0; RX_BUFFER_SIZE]),
            body: heapless::Vec::new(),
        })
    }

    async fn exchange(&mut self, url: &str) -> Result<u16, reqwless::Error> {
        let Self {
            stack,
            tcp,
            tls_read,
            tls_write,
            rx,
            body,
        } = self;

        let tcp_client = TcpClient::new(*stack, *tcp);
        let dns_client = DnsSocket::new(*stack);
        let tls_config = TlsConfig::new(RoscRng.next_u64(), &mut tls_read[..], &mut tls_write[..], TlsVerify::None);
        let mut client = HttpClient::new_with_tls(&tcp_client, &dns_client, tls_config);

        let mut request = client.request(Method::GET, url).await?;
        let response = request.send(&mut rx[..]).await?;
        let status = response.status.0;
        let content = response.body().read_to_end().await?;

        body.clear();
        body.extend_from_slice(content).map_err(|_| reqwless::Error::BufferTooSmall)?;
        Ok(status)
    }
}

impl HttpTransport for ReqwlessTransport {
    type Body<'a> = &'a [u8];

    async fn get<'a>(&'a mut self, url: &str) -> Result<HttpResponse<Self::Body<'a>>, TransportError> {
        debug!("HTTP GET -> {}", url);
        let status = self.exchange(url).await.map_err(transport_error)?;
        debug!("HTTP {} with {} bytes", status, self.body.len());
        Ok(HttpResponse::new(status, &self.body[..]))
    }
}

fn transport_error(e: reqwless::Error) -> TransportError {
    warn!("HTTP request failed: {:?}", e);
    match e {
        reqwless::Error::Dns => TransportError::Dns,
        reqwless::Error::Network(_) => TransportError::Connect,
        reqwless::Error::Tls(_) => TransportError::Tls,
        reqwless::Error::BufferTooSmall => TransportError::BodyTooLarge,
        _ => TransportError::Request,
    }
}
