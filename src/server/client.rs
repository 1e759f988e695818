//! The bulk query client: reads TREC topic files, sends each query to
//! the dispatcher, and prints TREC-format result lines.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use log::debug;

use crate::error::{Result, TrawlError};
use crate::query::response::Response;
use crate::server::protocol::QueryRequest;

/// A connection to a running dispatcher.
pub struct QueryClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl QueryClient {
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(QueryClient {
            writer: stream,
            reader,
        })
    }

    /// Send one request and read its reply. `EMPTYRESULTS` markers are
    /// normalised to an empty result list.
    pub fn send(&mut self, request: &QueryRequest) -> Result<Response> {
        let line = serde_json::to_string(request)?;
        debug!("sending {line}");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(TrawlError::corrupt("server closed the connection"));
        }
        let mut response: Response = serde_json::from_str(reply.trim())?;
        if response.is_empty_marker() {
            response.error.clear();
            response.results = Some(Vec::new());
        }
        Ok(response)
    }
}

/// Parse a TREC topic file: `<num> Number: <id>` lines followed by
/// `<title> Topic: <text>` lines.
pub fn parse_topic_file(r: impl BufRead) -> Result<Vec<(String, String)>> {
    let mut queries = Vec::new();
    let mut current_id: Option<String> = None;

    for line in r.lines() {
        let line = line?;
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("<num>") {
            let id = rest.trim().trim_start_matches("Number:").trim();
            current_id = Some(id.to_string());
        } else if let Some(rest) = line.strip_prefix("<title>") {
            let text = rest.trim().trim_start_matches("Topic:").trim();
            match current_id.take() {
                Some(id) => queries.push((id, text.to_string())),
                None => log::warn!("topic '{text}' has no preceding identifier"),
            }
        }
    }
    Ok(queries)
}

/// Print results as `<qid> Q0 <doc> <rank> <score> <source>` lines,
/// at most `limit` of them.
pub fn print_trec_results(
    w: &mut impl Write,
    query_id: &str,
    response: &Response,
    limit: usize,
) -> Result<()> {
    let Some(results) = response.results.as_ref() else {
        return Ok(());
    };
    for (rank, result) in results.iter().take(limit).enumerate() {
        writeln!(
            w,
            "{} Q0 {} {} {:.6} {}",
            query_id, result.document, rank, result.score, response.source
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_file() {
        let input = "\
<num> Number: 051
<title> Topic: Airbus Subsidies

<num> Number: 052
<title> Topic: South African Sanctions
";
        let queries = parse_topic_file(input.as_bytes()).unwrap();
        assert_eq!(
            queries,
            vec![
                ("051".to_string(), "Airbus Subsidies".to_string()),
                ("052".to_string(), "South African Sanctions".to_string()),
            ]
        );
    }

    #[test]
    fn test_print_trec_results() {
        let mut response = Response::new();
        response.push("FR890101-0001", 2.73);
        response.push("FR890101-0002", 1.5);
        response.source = "positional".to_string();

        let mut out = Vec::new();
        print_trec_results(&mut out, "051", &response, 1).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "051 Q0 FR890101-0001 0 2.730000 positional\n"
        );
    }
}
