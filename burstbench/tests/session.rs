use std::io::{self, Write};

use burstbench::Dispatcher;
use burstbench::console::Console;
use burstbench::measurement::Snapshot;
use burstbench::report::{CsvReport, ReportError, ReportRenderer};
use burstbench::session::{self, Ending, Session, SessionConfig, SessionError};
use burstbench::target::{Bounds, TargetSpec};
use burstbench_test::server::{TestServer, unreachable_url};

/// Records what it was asked to render.
#[derive(Debug, Default)]
struct RecordingRenderer {
    calls: usize,
    batch_sizes: Vec<usize>,
    targets: Vec<Vec<String>>,
    rounds: Vec<usize>,
}

impl ReportRenderer for RecordingRenderer {
    fn render(&mut self, snapshot: Snapshot<'_>) -> Result<(), ReportError> {
        self.calls += 1;
        self.batch_sizes = snapshot.batch_sizes().collect();
        self.targets = snapshot
            .groups()
            .iter()
            .map(|g| g.targets().iter().map(|t| t.target().name().to_owned()).collect())
            .collect();
        self.rounds = snapshot
            .groups()
            .iter()
            .flat_map(|g| g.targets().iter().map(|t| t.rounds().len()))
            .collect();
        Ok(())
    }
}

fn catalog(server: &TestServer) -> Vec<TargetSpec> {
    vec![
        TargetSpec {
            name: "app".into(),
            url: server.url("/api/prime/between/{from}/{to}"),
        },
        TargetSpec {
            name: "function".into(),
            url: server.url("/api/prime/check/{to}"),
        },
    ]
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(reqwest::Client::new())
}

#[tokio::test]
async fn interactive_session_records_and_exports() {
    burstbench_test::tracing::init();
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let input: &[u8] = b"all\n1000\n1100\n3\nabc\n0\n2\n3\nEXIT\n";
    let mut console = Console::new(input, Vec::new());
    let mut renderer = RecordingRenderer::default();

    let ending =
        session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
            .await
            .unwrap();

    assert_eq!(ending, Ending::Exported { rounds: 6 });
    assert_eq!(renderer.calls, 1);
    assert_eq!(renderer.batch_sizes, [3, 2]);
    assert_eq!(renderer.targets, [["app", "function"], ["app", "function"]]);
    assert_eq!(renderer.rounds, [2, 2, 1, 1]);

    let output = String::from_utf8(console.into_output()).unwrap();
    assert!(output.contains("Input the amount of requests or 'exit' to quit:"));
    assert!(output.contains("Input another amount or 'exit' to quit:"));
    assert_eq!(output.matches("Input should be a positive integer").count(), 2);
    assert!(output.contains("Measuring 3 calls to localhost"));
}

#[tokio::test]
async fn empty_session_is_not_exported() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let input: &[u8] = b"app\n1\n10\nexit\n";
    let mut console = Console::new(input, Vec::new());
    let mut renderer = RecordingRenderer::default();

    let ending =
        session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
            .await
            .unwrap();

    assert_eq!(ending, Ending::NothingRecorded);
    assert_eq!(renderer.calls, 0);
}

#[tokio::test]
async fn aborted_configuration_terminates() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let scripts: [&[u8]; 4] = [b"exit\n", b"app\n\n", b"app\n5\nexit\n", b""];
    for script in scripts {
        let mut console = Console::new(script, Vec::new());
        let mut renderer = RecordingRenderer::default();

        let ending =
            session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
                .await
                .unwrap();

        assert_eq!(ending, Ending::NotConfigured);
        assert_eq!(renderer.calls, 0);
    }
}

#[tokio::test]
async fn invalid_configuration_is_asked_again() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let input: &[u8] = b"nope\nfunction\nten\n100\n50\n200\n1\n";
    let mut console = Console::new(input, Vec::new());
    let mut renderer = RecordingRenderer::default();

    // The input ends after one batch, which closes the session like `exit`.
    let ending =
        session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
            .await
            .unwrap();

    assert_eq!(ending, Ending::Exported { rounds: 1 });
    assert_eq!(renderer.targets, [["function"]]);

    let output = String::from_utf8(console.into_output()).unwrap();
    assert!(output.contains("Unknown target `nope`"));
    assert!(output.contains("Input should be a valid integer"));
    assert!(output.contains("The upper bound must not be less than 100"));
}

#[tokio::test]
async fn failures_are_recorded_alongside_successes() {
    let server = TestServer::new().await;
    let specs = [
        TargetSpec {
            name: "up".into(),
            url: server.url("/api/prime/between/{from}/{to}"),
        },
        TargetSpec {
            name: "down".into(),
            url: unreachable_url("/api/prime/between/{from}/{to}"),
        },
    ];
    let config = SessionConfig::resolve(Bounds::new(1, 100).unwrap(), &specs).unwrap();
    let mut session = Session::new(config, dispatcher());

    let mut observed = Vec::new();
    session
        .run_round(5, |result| {
            observed.push((result.target().name().to_owned(), result.failures()));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(observed, [("up".to_owned(), 0), ("down".to_owned(), 5)]);

    let snapshot = session.store().snapshot();
    let group = snapshot.group(5).unwrap();
    assert_eq!(group.get("down").unwrap().records().count(), 5);
}

#[tokio::test]
async fn export_writes_csv_files() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);
    let config = SessionConfig::resolve(Bounds::new(1000, 1050).unwrap(), &catalog).unwrap();
    let mut session = Session::new(config, dispatcher());

    session.run_round(2, |_| Ok(())).await.unwrap();
    session.run_round(4, |_| Ok(())).await.unwrap();

    let tempdir = tempfile::tempdir().unwrap();
    let mut csv = CsvReport::new(tempdir.path());
    let ending = session.export(&mut [&mut csv]).unwrap();

    assert_eq!(ending, Ending::Exported { rounds: 4 });
    assert_eq!(csv.written().len(), 2);

    let contents = std::fs::read_to_string(tempdir.path().join("4-requests.csv")).unwrap();
    // header plus four requests for each of the two targets
    assert_eq!(contents.lines().count(), 9);
    assert!(contents.lines().nth(1).unwrap().starts_with("app,localhost,1,0,"));
}

#[tokio::test]
async fn undecodable_input_is_asked_again() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let input: &[u8] = b"app\n1\n10\n3\n\xff\xfe\n2\nexit\n";
    let mut console = Console::new(input, Vec::new());
    let mut renderer = RecordingRenderer::default();

    let ending =
        session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
            .await
            .unwrap();

    assert_eq!(ending, Ending::Exported { rounds: 2 });
    assert_eq!(renderer.batch_sizes, [3, 2]);

    let output = String::from_utf8(console.into_output()).unwrap();
    assert_eq!(output.matches("Input should be a positive integer").count(), 1);
}

/// Accepts prompts but fails once the results of a batch are printed.
#[derive(Debug, Default)]
struct BrokenResults {
    written: Vec<u8>,
}

impl Write for BrokenResults {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.starts_with(b"Measuring") {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn console_failure_still_exports_measurements() {
    let server = TestServer::new().await;
    let catalog = catalog(&server);

    let input: &[u8] = b"all\n1\n10\n2\n3\nexit\n";
    let mut console = Console::new(input, BrokenResults::default());
    let mut renderer = RecordingRenderer::default();

    let result =
        session::run_interactive(&mut console, &catalog, dispatcher(), &mut [&mut renderer])
            .await;

    assert!(matches!(result, Err(SessionError::Console(_))));
    assert_eq!(renderer.calls, 1);
    assert_eq!(renderer.batch_sizes, [2]);
    assert_eq!(renderer.targets, [["app", "function"]]);
}
