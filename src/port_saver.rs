use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Orbit, Rocket};
use tokio::sync::watch;

pub fn create_pair() -> (PortSaver, Port) {
    let (tx, rx) = watch::channel(None);
    (PortSaver { sender: tx }, Port { rx })
}

/// The port the server actually bound to, known once Rocket has lifted off.
#[derive(Clone)]
pub struct Port {
    rx: watch::Receiver<Option<u16>>,
}

impl Port {
    /// Waits for liftoff. `None` if the server was dropped before binding.
    pub async fn get(&self) -> Option<u16> {
        let mut rx = self.rx.clone();
        loop {
            let current = *rx.borrow();
            if current.is_some() {
                return current;
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

pub struct PortSaver {
    sender: watch::Sender<Option<u16>>,
}

#[rocket::async_trait]
impl Fairing for PortSaver {
    fn info(&self) -> Info {
        Info {
            name: "Port Saver",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let port = rocket.config().port;
        tracing::info!(port, "Web server listening");
        // No receiver left only means nobody is waiting for the port.
        let _ = self.sender.send(Some(port));
    }
}
