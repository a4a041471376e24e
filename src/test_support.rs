// In-process HTTP server for tests:
// - binds 127.0.0.1:0 so tests never collide on ports
// - graceful shutdown on drop so servers don't linger between tests
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::session::{MemoryTokenStore, Session};

pub struct TestServer {
  pub addr: SocketAddr,
  shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
  pub async fn spawn(router: Router) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0")
      .await
      .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
      let _ = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
          let _ = shutdown_rx.await;
        })
        .await;
    });
    Self {
      addr,
      shutdown: Some(shutdown_tx),
    }
  }

  pub fn base_url(&self) -> String {
    format!("http://{}", self.addr)
  }

  /// Client with an authenticated in-memory session.
  pub fn client(&self) -> ApiClient {
    self.client_with(Session::new(MemoryTokenStore::with_token("test-token")))
  }

  pub fn client_with(&self, session: Session) -> ApiClient {
    ApiClient::new(&self.base_url(), session).expect("valid base url")
  }
}

impl Drop for TestServer {
  fn drop(&mut self) {
    if let Some(tx) = self.shutdown.take() {
      let _ = tx.send(());
    }
  }
}

/// Shared request counter for handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
  pub fn bump(&self) -> usize {
    self.0.fetch_add(1, Ordering::SeqCst) + 1
  }

  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}
