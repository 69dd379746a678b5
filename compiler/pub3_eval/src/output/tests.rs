use super::*;

#[test]
fn buffer_sink_appends() {
    let sink = buffer_sink();
    sink.write_str("hello");
    sink.write_str(", ");
    sink.write_str("world");
    assert_eq!(sink.contents(), "hello, world");
}

#[test]
fn buffer_sink_take_empties() {
    let sink = BufferSink::new();
    sink.write_str("abc");
    assert_eq!(sink.take(), "abc");
    assert_eq!(sink.contents(), "");
}

#[test]
fn discard_sink_captures_nothing() {
    let sink = discard_sink();
    sink.write_str("gone");
    assert_eq!(sink.contents(), "");
}

#[test]
fn stdout_sink_captures_nothing() {
    let sink = stdout_sink();
    sink.write_str("");
    assert_eq!(sink.contents(), "");
}
