use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    initialize_once, ConnectionId, ContextId, NativeTexture, ServerDescription, SharedTexture,
    Transport, KEY_APP_NAME, KEY_SERVER_NAME, KEY_UUID,
};

/// In-process transport where every server and client shares one GPU context.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    registry: Arc<Mutex<Registry>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    servers: HashMap<u64, ServerEntry>,
    connections: HashMap<u64, ConnectionEntry>,
}

struct ServerEntry {
    description: ServerDescription,
    context: ContextId,
    current: Option<PublishedFrame>,
    generation: u64,
}

#[derive(Clone, Copy)]
struct PublishedFrame {
    texture: NativeTexture,
    width: u32,
    height: u32,
}

struct ConnectionEntry {
    server: u64,
    last_fetched: u64,
}

impl Registry {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn find_server(&self, name: &str) -> Option<u64> {
        if name.is_empty() {
            return None;
        }
        let by = |key: &str| {
            let mut ids: Vec<u64> = self
                .servers
                .iter()
                .filter(|(_, entry)| entry.description.get(key) == Some(name))
                .map(|(id, _)| *id)
                .collect();
            // Oldest announcement wins when names collide.
            ids.sort_unstable();
            ids.first().copied()
        };
        by(KEY_SERVER_NAME).or_else(|| by(KEY_APP_NAME))
    }

    fn server_for(&self, connection: ConnectionId) -> Option<(&ConnectionEntry, &ServerEntry)> {
        let entry = self.connections.get(&connection.0)?;
        let server = self.servers.get(&entry.server)?;
        Some((entry, server))
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        initialize_once();
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live client connections, including ones whose server retired.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }
}

impl Transport for LoopbackTransport {
    fn list_servers(&self) -> Vec<ServerDescription> {
        let registry = self.lock();
        let mut ids: Vec<&u64> = registry.servers.keys().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| registry.servers.get(id))
            .map(|entry| entry.description.clone())
            .collect()
    }

    fn connect(&self, name: &str) -> Option<ConnectionId> {
        let mut registry = self.lock();
        let server = registry.find_server(name)?;
        let id = registry.allocate_id();
        registry.connections.insert(
            id,
            ConnectionEntry {
                server,
                last_fetched: 0,
            },
        );
        tracing::debug!(name, connection = id, server, "loopback client connected");
        Some(ConnectionId(id))
    }

    fn describe(&self, connection: ConnectionId) -> ServerDescription {
        self.lock()
            .server_for(connection)
            .map(|(_, server)| server.description.clone())
            .unwrap_or_default()
    }

    fn has_new_frame(&self, connection: ConnectionId) -> bool {
        self.lock()
            .server_for(connection)
            .is_some_and(|(entry, server)| server.generation > entry.last_fetched)
    }

    fn fetch_texture(
        &self,
        connection: ConnectionId,
        context: ContextId,
    ) -> Option<SharedTexture> {
        let mut registry = self.lock();
        let (generation, server_context, frame) = {
            let (_, server) = registry.server_for(connection)?;
            (server.generation, server.context, server.current?)
        };
        if server_context != context {
            tracing::warn!(
                connection = connection.0,
                expected = server_context.0,
                actual = context.0,
                "texture fetched from a foreign GPU context"
            );
        }
        if let Some(entry) = registry.connections.get_mut(&connection.0) {
            entry.last_fetched = generation;
        }
        Some(SharedTexture {
            texture: frame.texture,
            width: frame.width,
            height: frame.height,
            generation,
            context: server_context,
        })
    }

    fn disconnect(&self, connection: ConnectionId) {
        if self.lock().connections.remove(&connection.0).is_some() {
            tracing::debug!(connection = connection.0, "loopback client disconnected");
        }
    }
}

/// Producer handle announcing one named server on a [`LoopbackTransport`].
///
/// The server disappears when retired or dropped; connected clients then see
/// no frames and an empty description.
pub struct LoopbackServer {
    transport: LoopbackTransport,
    id: u64,
    retired: bool,
}

impl LoopbackServer {
    pub fn announce(
        transport: &LoopbackTransport,
        app_name: &str,
        server_name: &str,
        context: ContextId,
    ) -> Self {
        let mut registry = transport.lock();
        let id = registry.allocate_id();
        let description = ServerDescription::new()
            .with(KEY_UUID, format!("loopback-{id}"))
            .with(KEY_APP_NAME, app_name)
            .with(KEY_SERVER_NAME, server_name);
        registry.servers.insert(
            id,
            ServerEntry {
                description,
                context,
                current: None,
                generation: 0,
            },
        );
        drop(registry);
        tracing::debug!(app_name, server_name, server = id, "loopback server announced");
        Self {
            transport: transport.clone(),
            id,
            retired: false,
        }
    }

    /// Makes `texture` the server's current frame and returns its generation.
    pub fn publish(&mut self, texture: NativeTexture, width: u32, height: u32) -> u64 {
        let mut registry = self.transport.lock();
        let Some(entry) = registry.servers.get_mut(&self.id) else {
            return 0;
        };
        entry.generation += 1;
        entry.current = Some(PublishedFrame {
            texture,
            width,
            height,
        });
        tracing::trace!(
            server = self.id,
            generation = entry.generation,
            %texture,
            "frame published"
        );
        entry.generation
    }

    pub fn description(&self) -> ServerDescription {
        self.transport
            .lock()
            .servers
            .get(&self.id)
            .map(|entry| entry.description.clone())
            .unwrap_or_default()
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn retire(&mut self) {
        if self.retired {
            return;
        }
        self.retired = true;
        self.transport.lock().servers.remove(&self.id);
        tracing::debug!(server = self.id, "loopback server retired");
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.retire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: ContextId = ContextId(1);

    #[test]
    fn connect_matches_server_name_before_app_name() {
        let transport = LoopbackTransport::new();
        let _a = LoopbackServer::announce(&transport, "Output", "Other", CTX);
        let b = LoopbackServer::announce(&transport, "Mixer", "Output", CTX);

        let connection = transport.connect("Output").expect("connection");
        assert_eq!(transport.describe(connection), b.description());
    }

    #[test]
    fn connect_by_app_name() {
        let transport = LoopbackTransport::new();
        let server = LoopbackServer::announce(&transport, "Mixer", "Main", CTX);
        let connection = transport.connect("Mixer").expect("connection");
        assert_eq!(transport.describe(connection), server.description());
    }

    #[test]
    fn unknown_or_empty_name_does_not_connect() {
        let transport = LoopbackTransport::new();
        let _server = LoopbackServer::announce(&transport, "Mixer", "", CTX);
        assert!(transport.connect("Nope").is_none());
        assert!(transport.connect("").is_none());
    }

    #[test]
    fn new_frame_flag_tracks_fetches() {
        let transport = LoopbackTransport::new();
        let mut server = LoopbackServer::announce(&transport, "Mixer", "Main", CTX);
        let connection = transport.connect("Main").unwrap();

        assert!(!transport.has_new_frame(connection));
        assert!(transport.fetch_texture(connection, CTX).is_none());

        assert_eq!(server.publish(NativeTexture(7), 4, 2), 1);
        assert!(transport.has_new_frame(connection));
        assert!(transport.has_new_frame(connection), "polling must not consume");

        let shared = transport.fetch_texture(connection, CTX).unwrap();
        assert_eq!(shared.generation, 1);
        assert_eq!((shared.width, shared.height), (4, 2));
        assert!(!transport.has_new_frame(connection));

        server.publish(NativeTexture(8), 4, 2);
        assert!(transport.has_new_frame(connection));
    }

    #[test]
    fn retired_server_reads_as_gone() {
        let transport = LoopbackTransport::new();
        let mut server = LoopbackServer::announce(&transport, "Mixer", "Main", CTX);
        let connection = transport.connect("Main").unwrap();
        server.publish(NativeTexture(1), 1, 1);
        server.retire();
        server.retire();

        assert!(transport.list_servers().is_empty());
        assert!(!transport.has_new_frame(connection));
        assert!(transport.fetch_texture(connection, CTX).is_none());
        assert!(transport.describe(connection).is_empty());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let transport = LoopbackTransport::new();
        let _server = LoopbackServer::announce(&transport, "Mixer", "Main", CTX);
        let connection = transport.connect("Main").unwrap();
        assert_eq!(transport.connection_count(), 1);
        transport.disconnect(connection);
        transport.disconnect(connection);
        assert_eq!(transport.connection_count(), 0);
    }
}
