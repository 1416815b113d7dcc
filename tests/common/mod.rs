use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use maze_race_server::codec::{self, HEADER_LEN};
use maze_race_server::config::Config;
use maze_race_server::reactor::Reactor;

/// Spin up a `Reactor` on an OS-assigned port and return the address clients
/// should connect to. The reactor runs for the lifetime of the test process.
pub async fn start_server(config: Config) -> SocketAddr {
    let reactor = Reactor::new(config);
    let listener = reactor.bind().await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(reactor.serve(listener));
    addr
}

pub async fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).await.expect("connect");
    stream.set_nodelay(true).ok();
    stream
}

/// One decoded frame: header fields plus the raw (unpadded) body.
pub struct Frame {
    pub main_type: codec::MainType,
    pub sub_type: u16,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("body is valid JSON")
    }
}

pub async fn send_frame(stream: &mut TcpStream, main: codec::MainType, sub: u16, body: &[u8]) {
    let frame = codec::encode(main, sub, body);
    stream.write_all(&frame).await.expect("write frame");
}

/// Read exactly one frame, failing the test if none arrives within the
/// timeout rather than hanging forever on a broken handler.
pub async fn read_frame(stream: &mut TcpStream) -> Frame {
    timeout(Duration::from_secs(5), read_frame_inner(stream))
        .await
        .expect("timed out waiting for a frame")
}

/// Reconstruct a shortest walkable path (as a sequence of single-step
/// points, excluding `start`) from a map's `extract_map_info` JSON to
/// `target`, by BFS over the same non-obstacle interior the server carved.
/// The server guarantees every carved map is fully connected, which is
/// what makes `target` always reachable here.
pub fn bfs_path(map: &Value, target: (i32, i32)) -> Vec<(i32, i32)> {
    use std::collections::{HashMap, HashSet, VecDeque};

    let width = map["width"].as_i64().unwrap() as i32;
    let height = map["height"].as_i64().unwrap() as i32;
    let start = (
        map["start"]["x"].as_i64().unwrap() as i32,
        map["start"]["y"].as_i64().unwrap() as i32,
    );
    let obstacles: HashSet<(i32, i32)> = map["obstacles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| (o["x"].as_i64().unwrap() as i32, o["y"].as_i64().unwrap() as i32))
        .collect();

    let is_walkable =
        |p: (i32, i32)| p.0 > 0 && p.1 > 0 && p.0 < width - 1 && p.1 < height - 1 && !obstacles.contains(&p);

    let mut queue = VecDeque::new();
    let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    let mut visited = HashSet::new();
    queue.push_back(start);
    visited.insert(start);

    while let Some(current) = queue.pop_front() {
        if current == target {
            break;
        }
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let next = (current.0 + dx, current.1 + dy);
            if (next == target || is_walkable(next)) && visited.insert(next) {
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut current = target;
    while current != start {
        path.push(current);
        current = *came_from
            .get(&current)
            .expect("target must be reachable from start per the server's connectivity guarantee");
    }
    path.reverse();
    path
}

async fn read_frame_inner(stream: &mut TcpStream) -> Frame {
    let mut header_buf = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_buf).await.expect("read header");
    let header = codec::decode_header(&header_buf).expect("decode header");

    let padded = codec::body_padded_length(header.body_length) as usize;
    let mut body = vec![0u8; padded];
    stream.read_exact(&mut body).await.expect("read body");
    body.truncate(header.body_length as usize);

    Frame {
        main_type: header.main_type,
        sub_type: header.sub_type,
        body,
    }
}
