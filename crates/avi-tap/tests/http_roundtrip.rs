//! Cliente HTTP contra un servidor UWS mínimo levantado en localhost.

use avi_tap::{AsyncJob, HttpTapService, JobPhase, PollPolicy, TapError};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Request {
    method: String,
    path: String,
    body: String,
}

struct Reply {
    status: u16,
    location: Option<&'static str>,
    body: Vec<u8>,
}

impl Reply {
    fn ok(body: impl Into<Vec<u8>>) -> Self {
        Reply { status: 200,
                location: None,
                body: body.into() }
    }

    fn see_other(location: &'static str) -> Self {
        Reply { status: 303,
                location: Some(location),
                body: Vec::new() }
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Request { method,
                   path,
                   body: String::from_utf8_lossy(&body).into_owned() })
}

/// Arranca el servidor; devuelve la URL base y el registro de peticiones.
fn serve<F>(handler: F) -> (String, Arc<Mutex<Vec<Request>>>)
    where F: Fn(&Request) -> Reply + Send + 'static
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_srv = log.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Some(req) = read_request(&mut stream) else { continue };
            let reply = handler(&req);
            log_srv.lock().unwrap().push(req);
            let mut head = format!("HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n",
                                   reply.status,
                                   reply.body.len());
            if let Some(loc) = reply.location {
                head.push_str(&format!("Location: {loc}\r\n"));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&reply.body);
            let _ = stream.flush();
        }
    });
    (format!("http://{addr}/tap"), log)
}

fn fast() -> PollPolicy {
    PollPolicy { interval: Duration::from_millis(1),
                 backoff: 1.0,
                 max_interval: Duration::from_millis(1),
                 timeout: Duration::from_secs(10) }
}

const RESULT: &[u8] = b"<?xml version=\"1.0\"?>\n<VOTABLE><RESOURCE/></VOTABLE>\n";

#[test]
fn full_job_lifecycle_over_http() {
    let polls = AtomicUsize::new(0);
    let (base, log) = serve(move |req| match (req.method.as_str(), req.path.as_str()) {
                          ("POST", "/tap/async") => Reply::see_other("/tap/async/77"),
                          ("POST", "/tap/async/77/phase") => Reply::see_other("/tap/async/77"),
                          ("GET", "/tap/async/77/phase") => {
                              if polls.fetch_add(1, Ordering::SeqCst) == 0 {
                                  Reply::ok("EXECUTING")
                              } else {
                                  Reply::ok("COMPLETED")
                              }
                          }
                          ("GET", "/tap/async/77/results/result") => Reply::see_other("/files/result.vot"),
                          ("GET", "/files/result.vot") => Reply::ok(RESULT),
                          ("DELETE", "/tap/async/77") => Reply::see_other("/tap/async"),
                          _ => Reply { status: 404,
                                       location: None,
                                       body: Vec::new() },
                      });

    let svc = Arc::new(HttpTapService::new(&base, Duration::from_secs(5)).unwrap());
    let mut job = AsyncJob::new(svc, "SELECT TOP 5 * FROM \"I/239/hip_main\"").unwrap().with_policy(fast());
    job.run().unwrap();
    assert_eq!(job.job_id(), Some("77"));
    assert_eq!(job.open_result().unwrap(), RESULT);
    job.delete().unwrap();

    let log = log.lock().unwrap().clone();
    let seen: Vec<String> = log.iter().map(|r| format!("{} {}", r.method, r.path)).collect();
    assert_eq!(seen,
               vec!["POST /tap/async",
                    "POST /tap/async/77/phase",
                    "GET /tap/async/77/phase",
                    "GET /tap/async/77/phase",
                    "GET /tap/async/77/results/result",
                    "GET /files/result.vot",
                    "DELETE /tap/async/77"]);
    assert!(log[0].body.contains("REQUEST=doQuery"));
    assert!(log[0].body.contains("LANG=ADQL"));
    assert!(log[0].body.contains("FORMAT=votable"));
    assert_eq!(log[1].body, "PHASE=RUN");
}

#[test]
fn failed_job_reports_error_document() {
    let (base, _log) = serve(|req| match (req.method.as_str(), req.path.as_str()) {
                             ("POST", "/tap/async") => Reply::see_other("/tap/async/9"),
                             ("POST", "/tap/async/9/phase") => Reply::see_other("/tap/async/9"),
                             ("GET", "/tap/async/9/phase") => Reply::ok("ERROR"),
                             ("GET", "/tap/async/9/error") => Reply::ok(
                                 r#"<VOTABLE><RESOURCE><INFO name="QUERY_STATUS" value="ERROR">Unknown column "ra"</INFO></RESOURCE></VOTABLE>"#,
                             ),
                             _ => Reply { status: 404,
                                          location: None,
                                          body: Vec::new() },
                         });

    let svc = Arc::new(HttpTapService::new(&base, Duration::from_secs(5)).unwrap());
    let mut job = AsyncJob::new(svc, "SELECT ra FROM t").unwrap().with_policy(fast());
    match job.run() {
        Err(TapError::JobFailed { job_id, message }) => {
            assert_eq!(job_id, "9");
            assert_eq!(message, "Unknown column \"ra\"");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(job.phase(), Some(JobPhase::Error));
}

#[test]
fn http_error_status_is_reported() {
    let (base, _log) = serve(|_| Reply { status: 500,
                                         location: None,
                                         body: b"boom".to_vec() });
    let svc = Arc::new(HttpTapService::new(&base, Duration::from_secs(5)).unwrap());
    let mut job = AsyncJob::new(svc, "SELECT 1").unwrap();
    assert!(matches!(job.run(), Err(TapError::Status { status: 500, method: "POST", .. })));
}
