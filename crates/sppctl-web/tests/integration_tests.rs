//! Integration tests for the spp-ctl REST gateway.
//!
//! Each test starts a controller and the gateway on OS-assigned ports, then
//! connects scripted fake workers and drives the REST API with reqwest.

use serde_json::{json, Value};
use sppctl_core::{BrokerConfig, Controller, LayoutSourceConfig, ListenerHandle, ProcessType};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Harness {
    controller: Arc<Controller>,
    listeners: ListenerHandle,
    api: String,
    client: reqwest::Client,
    _sysfs: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let sysfs = TempDir::new().unwrap();
        let config = BrokerConfig {
            bind_addr: "127.0.0.1".to_string(),
            primary_port: 0,
            secondary_port: 0,
            api_port: 0,
            command_timeout: Duration::from_secs(2),
            layout_source: LayoutSourceConfig::Sysfs(sysfs.path().to_path_buf()),
        };
        let controller = Arc::new(Controller::new(&config));
        let listeners = controller.listen(&config).await.unwrap();
        let addr = sppctl_web::start_server(controller.clone(), "127.0.0.1", 0)
            .await
            .unwrap();

        Self {
            controller,
            listeners,
            api: format!("http://{}/v1", addr),
            client: reqwest::Client::new(),
            _sysfs: sysfs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {}", path);
        response.json().await.unwrap()
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        // The gateway must accept JSON without a JSON content type.
        self.client
            .put(self.url(path))
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    async fn wait_for(&self, id: u32, kind: ProcessType) {
        for _ in 0..200 {
            if let Some(proc) = self.controller.registry().get(id).await {
                if proc.kind() == kind {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{}({}) never registered", kind, id);
    }
}

fn success() -> String {
    json!({"results": [{"result": "success"}]}).to_string()
}

fn failure(message: &str) -> String {
    json!({"results": [{"result": "error", "error_details": {"message": message}}]}).to_string()
}

/// Connect a fake worker; `handler` answers each command, `None` hangs up.
fn spawn_worker<F>(addr: SocketAddr, mut handler: F) -> JoinHandle<()>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = vec![0u8; 4096];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            let command = String::from_utf8_lossy(&buf[..n]).into_owned();
            let Some(reply) = handler(&command) else {
                return;
            };
            if stream.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    })
}

fn hello(process_type: &str, client_id: u32) -> String {
    json!({"results": [{"result": "success"}], "process_type": process_type, "client_id": client_id})
        .to_string()
}

/// Forwarder secondary keeping a port list.
fn nfv_worker(client_id: u32) -> impl FnMut(&str) -> Option<String> + Send + 'static {
    let mut ports: Vec<String> = Vec::new();
    move |command| {
        let words: Vec<&str> = command.split_whitespace().collect();
        let reply = match words.as_slice() {
            ["_get_client_id"] => hello("nfv", client_id),
            ["status"] => json!({
                "client-id": client_id,
                "status": "idling",
                "master-lcore": 1,
                "lcores": [1, 2],
                "ports": ports,
                "patches": []
            })
            .to_string(),
            ["add", port] => {
                ports.push(port.to_string());
                success()
            }
            ["del", port] => {
                ports.retain(|p| p != port);
                success()
            }
            ["exit"] => success(),
            _ => return None,
        };
        Some(reply)
    }
}

#[derive(Default)]
struct Component {
    name: String,
    core: u32,
    kind: String,
    rx: Vec<String>,
    tx: Vec<String>,
}

/// Classifier/mirror secondary keeping components and their ports.
fn component_worker(process_type: &'static str, client_id: u32) -> impl FnMut(&str) -> Option<String> + Send + 'static {
    let mut components: Vec<Component> = Vec::new();
    move |command| {
        let words: Vec<&str> = command.split_whitespace().collect();
        let reply = match words.as_slice() {
            ["_get_client_id"] => hello(process_type, client_id),
            ["status"] => {
                let core: Vec<Value> = components
                    .iter()
                    .map(|c| {
                        json!({
                            "core": c.core,
                            "name": c.name,
                            "type": c.kind,
                            "rx_port": c.rx.iter().map(|p| json!({"port": p})).collect::<Vec<_>>(),
                            "tx_port": c.tx.iter().map(|p| json!({"port": p})).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                json!({
                    "results": [{"result": "success"}],
                    "info": {
                        "client-id": client_id,
                        "phy": [0],
                        "vhost": [],
                        "ring": [3],
                        "master-lcore": 4,
                        "core": core,
                        "classifier_table": []
                    }
                })
                .to_string()
            }
            ["component", "start", name, core, kind] => {
                let core: u32 = core.parse().unwrap();
                if components.iter().any(|c| c.core == core) {
                    failure(&format!("core {} is already in use", core))
                } else {
                    components.push(Component {
                        name: name.to_string(),
                        core,
                        kind: kind.to_string(),
                        ..Component::default()
                    });
                    success()
                }
            }
            ["component", "stop", name] => {
                components.retain(|c| c.name != *name);
                success()
            }
            ["port", action, port, dir, name, ..] => {
                let Some(component) = components.iter_mut().find(|c| c.name == *name) else {
                    return Some(failure("no such component"));
                };
                let ports = if *dir == "rx" { &mut component.rx } else { &mut component.tx };
                match *action {
                    "add" => ports.push(port.to_string()),
                    _ => ports.retain(|p| p != port),
                }
                success()
            }
            ["classifier_table", ..] => success(),
            ["exit"] => success(),
            _ => return None,
        };
        Some(reply)
    }
}

#[tokio::test]
async fn test_nfv_port_add_then_status() {
    let harness = Harness::start().await;
    let _worker = spawn_worker(harness.listeners.secondary_addr, nfv_worker(1));
    harness.wait_for(1, ProcessType::Nfv).await;

    let response = harness
        .put("/nfvs/1/ports", json!({"action": "add", "port": "ring:0"}))
        .await;
    assert_eq!(response.status(), 204);

    let status = harness.get_json("/nfvs/1").await;
    assert_eq!(status["ports"], json!(["ring:0"]));

    let response = harness
        .put("/nfvs/1/ports", json!({"action": "del", "port": "ring:0"}))
        .await;
    assert_eq!(response.status(), 204);
    assert_eq!(harness.get_json("/nfvs/1").await["ports"], json!([]));
}

#[tokio::test]
async fn test_nfv_validation_errors() {
    let harness = Harness::start().await;
    let _worker = spawn_worker(harness.listeners.secondary_addr, nfv_worker(1));
    harness.wait_for(1, ProcessType::Nfv).await;

    let response = harness.put("/nfvs/1/ports", json!({"action": "add"})).await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "key(port) required.");

    let response = harness
        .put("/nfvs/1/ports", json!({"action": "add", "port": "eth:0"}))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "invalid key(port): eth:0.");

    let response = harness
        .put("/nfvs/1/forward", json!({"action": "pause"}))
        .await;
    assert_eq!(response.status(), 400);

    let response = harness
        .client
        .put(harness.url("/nfvs/1/patches"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = harness.get("/nfvs/9").await;
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), "sec_id 9 not found.");

    // Right id, wrong process type.
    assert_eq!(harness.get("/vfs/1").await.status(), 404);
}

#[tokio::test]
async fn test_vf_component_core_conflict() {
    let harness = Harness::start().await;
    let _worker = spawn_worker(harness.listeners.secondary_addr, component_worker("vf", 2));
    harness.wait_for(2, ProcessType::Vf).await;

    let response = harness
        .post("/vfs/2/components", json!({"name": "cls1", "core": 5, "type": "classifier"}))
        .await;
    assert_eq!(response.status(), 204);

    let response = harness
        .post("/vfs/2/components", json!({"name": "fwd1", "core": 5, "type": "forward"}))
        .await;
    assert_eq!(response.status(), 400);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(
        payload["results"][0]["error_details"]["message"],
        "core 5 is already in use"
    );

    let info = harness.get_json("/vfs/2").await;
    let names: Vec<&str> = info["components"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["cls1"]);
    assert_eq!(info["ports"], json!(["phy:0", "ring:3"]));

    let response = harness
        .post("/vfs/2/components", json!({"name": "mr1", "core": 6, "type": "mirror"}))
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "invalid key(type): mirror.");
}

#[tokio::test]
async fn test_component_names_must_be_single_tokens() {
    let harness = Harness::start().await;
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
    let mut worker = component_worker("vf", 2);
    let _worker = spawn_worker(harness.listeners.secondary_addr, move |command| {
        seen_tx.send(command.to_string()).ok();
        worker(command)
    });
    harness.wait_for(2, ProcessType::Vf).await;
    assert_eq!(seen_rx.recv().await.unwrap(), "_get_client_id");

    let response = harness
        .post(
            "/vfs/2/components",
            json!({"name": "fwd1 9 merge\nexit", "core": 5, "type": "forward"}),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response.text().await.unwrap(),
        "invalid key(name): fwd1 9 merge\nexit."
    );

    let response = harness.delete("/vfs/2/components/a%20b").await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "invalid key(name): a b.");

    let response = harness
        .put(
            "/vfs/2/components/%09/ports",
            json!({"action": "attach", "port": "ring:1", "dir": "rx"}),
        )
        .await;
    assert_eq!(response.status(), 400);

    // nothing above reached the worker
    let response = harness
        .post("/vfs/2/components", json!({"name": "fwd1", "core": 5, "type": "forward"}))
        .await;
    assert_eq!(response.status(), 204);
    assert_eq!(seen_rx.recv().await.unwrap(), "component start fwd1 5 forward");
}

#[tokio::test]
async fn test_vf_component_port_attach_detach() {
    let harness = Harness::start().await;
    let _worker = spawn_worker(harness.listeners.secondary_addr, component_worker("vf", 2));
    harness.wait_for(2, ProcessType::Vf).await;

    let response = harness
        .post("/vfs/2/components", json!({"name": "worker1", "core": 5, "type": "forward"}))
        .await;
    assert_eq!(response.status(), 204);

    let response = harness
        .put(
            "/vfs/2/components/worker1/ports",
            json!({"action": "attach", "port": "ring:3", "dir": "rx",
                   "vlan": {"operation": "add", "id": 101, "pcp": 3}}),
        )
        .await;
    assert_eq!(response.status(), 204);
    let info = harness.get_json("/vfs/2").await;
    assert_eq!(info["components"][0]["rx_port"][0]["port"], "ring:3");

    let response = harness
        .put(
            "/vfs/2/components/worker1/ports",
            json!({"action": "detach", "port": "ring:3", "dir": "rx"}),
        )
        .await;
    assert_eq!(response.status(), 204);
    let info = harness.get_json("/vfs/2").await;
    assert_eq!(info["components"][0]["rx_port"], json!([]));

    let response = harness
        .put(
            "/vfs/2/classifier_table",
            json!({"action": "add", "type": "vlan", "port": "ring:3",
                   "mac_address": "aa:bb:cc:dd:ee:ff"}),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "invalid key(vlan): None.");

    let response = harness.delete("/vfs/2/components/worker1").await;
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_mirror_handshake_listed() {
    let harness = Harness::start().await;
    let _worker = spawn_worker(harness.listeners.secondary_addr, component_worker("mirror", 7));
    harness.wait_for(7, ProcessType::Mirror).await;

    let processes = harness.get_json("/processes").await;
    assert_eq!(processes, json!([{"type": "mirror", "client-id": 7}]));
    assert_eq!(harness.get("/vfs/7").await.status(), 404);
    assert_eq!(harness.get("/mirrors/7").await.status(), 200);

    // classifier table is vf only
    let response = harness
        .put("/mirrors/7/classifier_table", json!({}))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_closed_worker_is_pruned() {
    let harness = Harness::start().await;
    let (hangup_tx, mut hangup_rx) = mpsc::unbounded_channel::<()>();
    let mut nfv = nfv_worker(1);
    let _worker = spawn_worker(harness.listeners.secondary_addr, move |command| {
        if hangup_rx.try_recv().is_ok() {
            return None;
        }
        nfv(command)
    });
    harness.wait_for(1, ProcessType::Nfv).await;
    assert_eq!(harness.get("/nfvs/1").await.status(), 200);

    hangup_tx.send(()).unwrap();
    let response = harness.get("/nfvs/1").await;
    assert_eq!(response.status(), 500);

    assert_eq!(harness.get_json("/processes").await, json!([]));
    assert_eq!(harness.get("/nfvs/1").await.status(), 404);
}

#[tokio::test]
async fn test_primary_launch() {
    let harness = Harness::start().await;
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
    let _primary = spawn_worker(harness.listeners.primary_addr, move |command| {
        seen_tx.send(command.to_string()).ok();
        Some(match command {
            "status" => json!({"status": "running", "lcores": [0], "ports": []}).to_string(),
            _ => json!({"result": "success"}).to_string(),
        })
    });
    harness.wait_for(0, ProcessType::Primary).await;

    // mandatory options missing: nothing reaches the primary
    let response = harness
        .put(
            "/primary/launch",
            json!({"client_id": 2, "proc_name": "spp_nfv", "eal": {"-l": "1,2"}, "app": {}}),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "key(--proc-type) required.");

    let response = harness
        .put(
            "/primary/launch",
            json!({"client_id": 2, "proc_name": "spp_nfv exit", "eal": {}, "app": {}}),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "invalid key(proc_name): spp_nfv exit.");

    let response = harness
        .put(
            "/primary/launch",
            json!({
                "client_id": 2,
                "proc_name": "spp_nfv",
                "eal": {"-l": "1,2", "--proc-type": "secondary", "--bogus": "x", "-m": 512},
                "app": {"-n": 2, "-s": "127.0.0.1:6666"}
            }),
        )
        .await;
    assert_eq!(response.status(), 204);
    assert_eq!(
        seen_rx.recv().await.unwrap(),
        "launch 2 spp_nfv -l 1,2 --proc-type secondary -m 512 -- -n 2 -s 127.0.0.1:6666"
    );

    let status = harness.get_json("/primary/status").await;
    assert_eq!(status["status"], "running");
    assert_eq!(seen_rx.recv().await.unwrap(), "status");

    let usage = harness.get_json("/cpu_usage").await;
    assert_eq!(usage, json!([{"proc-type": "primary", "master-lcore": 0, "lcores": [0]}]));
}

#[tokio::test]
async fn test_primary_missing_is_not_found() {
    let harness = Harness::start().await;
    let response = harness.get("/primary/status").await;
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), "primary not found.");
}

#[tokio::test]
async fn test_cpu_layout_unavailable_is_empty() {
    let harness = Harness::start().await;
    assert_eq!(harness.get_json("/cpu_layout").await, json!([]));
    assert_eq!(harness.get_json("/cpu_unused").await, json!({"sockets": []}));
}

#[tokio::test]
async fn test_pcap_capture_and_exit() {
    let harness = Harness::start().await;
    let mut capturing = false;
    let _worker = spawn_worker(harness.listeners.secondary_addr, move |command| {
        Some(match command {
            "_get_client_id" => hello("pcap", 4),
            "status" => json!({
                "results": [{"result": "success"}],
                "info": {"client-id": 4, "status": if capturing { "running" } else { "idle" },
                         "master-lcore": 5, "core": [{"core": 6, "role": "receive"}]}
            })
            .to_string(),
            "start" => {
                capturing = true;
                success()
            }
            "stop" => {
                capturing = false;
                success()
            }
            "exit" => success(),
            _ => return None,
        })
    });
    harness.wait_for(4, ProcessType::Pcap).await;

    let response = harness.put("/pcaps/4/capture", json!({"action": "start"})).await;
    assert_eq!(response.status(), 204);
    assert_eq!(harness.get_json("/pcaps/4").await["status"], "running");

    assert_eq!(harness.delete("/pcaps/4").await.status(), 204);
    assert_eq!(harness.get("/pcaps/4").await.status(), 404);
}
