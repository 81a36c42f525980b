//! `TourneyServer` builder and server loop.
//!
//! This is the entry point for running a tournament server. It ties
//! together all the layers: transport → protocol → state → dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use tourney_protocol::{Codec, JsonCodec};
use tourney_state::Hub;
use tourney_transport::{
    Connection, ConnectionRegistry, Incoming, Transport, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::nat::{open_port, NoPortMapping, PortMapper};
use crate::{Dispatcher, ServerConfig, TourneyError};

/// The hub type every server instance runs.
pub type ServerHub<C> = Hub<Arc<ConnectionRegistry>, C>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) dispatcher: Dispatcher<Arc<ConnectionRegistry>, C>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a tournament server.
///
/// # Example
///
/// ```rust,ignore
/// use tourney::prelude::*;
///
/// let config = ServerConfig::load_or_init("serverConfig.json")?;
/// let server = TourneyServer::builder().config(config).build().await?;
/// server.run().await
/// ```
pub struct TourneyServerBuilder<M: PortMapper = NoPortMapping> {
    bind_addr: Option<String>,
    config: ServerConfig,
    port_mapper: M,
}

impl TourneyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            config: ServerConfig::default(),
            port_mapper: NoPortMapping,
        }
    }
}

impl Default for TourneyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: PortMapper> TourneyServerBuilder<M> {
    /// Listens on `addr` instead of the configured port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the mechanism used to open the listening port on the gateway.
    pub fn port_mapper<N: PortMapper>(
        self,
        port_mapper: N,
    ) -> TourneyServerBuilder<N> {
        TourneyServerBuilder {
            bind_addr: self.bind_addr,
            config: self.config,
            port_mapper,
        }
    }

    /// Binds the listener and starts port mapping in the background.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<TourneyServer<JsonCodec>, TourneyError> {
        let addr = self
            .bind_addr
            .clone()
            .unwrap_or_else(|| self.config.bind_addr());
        let transport = WebSocketTransport::bind(&addr).await?;
        let port = transport.local_addr()?.port();

        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(Hub::new(Arc::clone(&registry), JsonCodec));
        let dispatcher = Dispatcher::new(
            hub,
            self.config.server_name.clone(),
            self.config.settings(),
        );

        let mapper = self.port_mapper;
        tokio::spawn(async move {
            let _ = open_port(&mapper, port).await;
        });

        let state = Arc::new(ServerState {
            registry,
            dispatcher,
            codec: JsonCodec,
        });
        tracing::info!(
            server_name = %self.config.server_name,
            %port,
            "tourney server ready"
        );
        Ok(TourneyServer { transport, state })
    }
}

/// A running tournament server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TourneyServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl TourneyServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> TourneyServerBuilder {
        TourneyServerBuilder::new()
    }
}

impl<C: Codec> TourneyServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The state hub, for reading state and subscribing to changes
    /// in-process.
    pub fn hub(&self) -> &Arc<ServerHub<C>> {
        self.state.dispatcher.hub()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a task for each accepted peer. The WebSocket upgrade runs
    /// inside that task, bounded by the transport's handshake timeout,
    /// so the loop goes straight back to accepting. Runs until the
    /// process is terminated; a failed accept is logged and the loop
    /// continues.
    pub async fn run(mut self) -> Result<(), TourneyError> {
        tracing::info!("tourney server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = incoming.id().clone();
                        let conn = match incoming.establish().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::warn!(
                                    %conn_id,
                                    error = %e,
                                    "WebSocket upgrade failed"
                                );
                                return;
                            }
                        };
                        tracing::info!(conn_id = %conn.id(), "client connected");
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
