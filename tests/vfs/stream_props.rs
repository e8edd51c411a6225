/*!
 * Stream Properties
 * Property tests for the chunked stream and the memory store built on it
 */

use layerfs::vfs::stream::content_length;
use layerfs::vfs::{ChunkedStream, FileSystem, MemFs, MemFsConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::common::read_all;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_write_at_offset_round_trips(
        data in prop::collection::vec(any::<u8>(), 1..600),
        offset in 0u64..300,
        chunk_size in 1usize..64,
    ) {
        let fs = MemFs::with_config(MemFsConfig::small_chunks(chunk_size));
        fs.create_file("/f").unwrap();

        let handle = fs.open_file("/f", false, true).unwrap();
        fs.write(&handle, &data, offset).unwrap();
        fs.close(&handle).unwrap();

        let mut expected = vec![0u8; offset as usize];
        expected.extend_from_slice(&data);
        prop_assert_eq!(read_all(&fs, "/f"), expected);
    }

    #[test]
    fn prop_length_invariant_holds(
        writes in prop::collection::vec((0u64..200, prop::collection::vec(any::<u8>(), 0..50)), 1..12),
        truncate in prop::option::of(0u64..250),
        chunk_size in 1usize..32,
    ) {
        let mut stream = ChunkedStream::new(chunk_size);
        let mut model: Vec<u8> = Vec::new();

        for (offset, data) in &writes {
            stream.seek(*offset, true).unwrap();
            stream.write(data);

            let end = *offset as usize + data.len();
            if model.len() < *offset as usize {
                model.resize(*offset as usize, 0);
            }
            if model.len() < end {
                model.resize(end, 0);
            }
            model[*offset as usize..end].copy_from_slice(data);
        }
        if let Some(length) = truncate {
            stream.set_length(length);
            model.resize(length as usize, 0);
        }

        prop_assert_eq!(stream.len(), model.len() as u64);
        prop_assert_eq!(content_length(stream.chunks()), stream.len());
        prop_assert_eq!(stream.chunk_count() as u64, stream.len() / chunk_size as u64 + 1);
        prop_assert_eq!(stream.to_vec(), model);
    }

    #[test]
    fn prop_read_spans_chunks(
        content in prop::collection::vec(any::<u8>(), 0..400),
        start in 0u64..450,
        len in 0usize..128,
        chunk_size in 1usize..48,
    ) {
        let mut stream = ChunkedStream::from_bytes(&content, chunk_size);
        let mut buffer = vec![0u8; len];

        if start <= content.len() as u64 {
            stream.seek(start, false).unwrap();
            let n = stream.read(&mut buffer);
            let from = start as usize;
            let to = (from + len).min(content.len());
            prop_assert_eq!(&buffer[..n], &content[from..to]);
            prop_assert_eq!(stream.position(), to as u64);
        } else {
            prop_assert!(stream.seek(start, false).is_err());
        }
    }
}

#[test]
fn test_sparse_write_of_two_bytes() {
    let mut stream = ChunkedStream::new(4);
    stream.seek(10, true).unwrap();
    stream.write(&[88, 89]);

    assert_eq!(stream.len(), 12);
    assert_eq!(stream.chunk_count(), 4);
    assert_eq!(stream.to_vec(), [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 88, 89]);
}

#[test]
fn test_write_at_exact_chunk_end_appends_chunk() {
    let mut stream = ChunkedStream::new(4);
    stream.write(b"abcd");
    assert_eq!(stream.chunk_count(), 2);
    assert!(stream.chunks()[0].is_full());
    assert_eq!(stream.chunks()[1].filled(), 0);

    stream.write(b"e");
    assert_eq!(stream.to_vec(), b"abcde");
}

#[test]
fn test_set_length_zeroes_discarded_tail() {
    let mut stream = ChunkedStream::from_bytes(b"0123456789", 4);
    stream.set_length(3);
    stream.set_length(8);
    assert_eq!(stream.to_vec(), b"012\0\0\0\0\0");
    assert_eq!(stream.position(), 8);
}
