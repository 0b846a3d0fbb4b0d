use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use crate::error::ExecutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn label(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Drain `rd` into memory while logging every complete line against `task_id`.
///
/// The task resolves to the full captured bytes once the stream reaches EOF.
pub fn pump<R>(
    mut rd: R,
    stream: OutputStream,
    task_id: String,
) -> JoinHandle<Result<Vec<u8>, ExecutorError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut captured = Vec::new();
        let mut line_buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| ExecutorError::StreamIo {
                stream: stream.label(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            captured.extend_from_slice(&buf[..n]);

            line_buf.extend_from_slice(&buf[..n]);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let mut one = line_buf.drain(..=pos).collect::<Vec<u8>>();
                trim_newline(&mut one);
                emit_line(stream, &task_id, &String::from_utf8_lossy(&one));
            }
        }

        // EOF flush: the last line may not end with '\n'.
        trim_newline(&mut line_buf);
        if !line_buf.is_empty() {
            emit_line(stream, &task_id, &String::from_utf8_lossy(&line_buf));
        }

        Ok(captured)
    })
}

/// Log previously captured output as if the process had just produced it.
pub fn replay(stream: OutputStream, task_id: &str, data: &[u8]) {
    for line in String::from_utf8_lossy(data).lines() {
        emit_line(stream, task_id, line);
    }
}

fn emit_line(stream: OutputStream, task_id: &str, line: &str) {
    match stream {
        OutputStream::Stdout => tracing::info!(task_id, "{line}"),
        OutputStream::Stderr => tracing::error!(task_id, "{line}"),
    }
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn captures_everything_including_unterminated_last_line() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let task = pump(rd, OutputStream::Stdout, "pkg/echo".into());

        wr.write_all(b"hello\r\nworld").await.unwrap();
        drop(wr);

        let captured = task.await.unwrap().unwrap();
        assert_eq!(captured, b"hello\r\nworld");
    }

    #[test]
    fn trims_crlf() {
        let mut line = b"abc\r\n".to_vec();
        trim_newline(&mut line);
        assert_eq!(line, b"abc");
    }
}
