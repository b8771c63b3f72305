use rand::Rng;

use crate::hasher::{sha256, Hasher};

// FIPS 180-4 known-answer vectors plus the block-boundary lengths that
// exercise the one-extra-padding-block case.
static ANSWERS: &[(&[u8], &str)] = &[
    (
        b"",
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    ),
    (
        b"abc",
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    ),
    (
        b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
        "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
    ),
    (
        &[b'a'; 55],
        "9f4390f8d30c2dd92ec9f095b65e2b9ae9b0a925a5258e241c9f1e910f734318",
    ),
    (
        &[b'a'; 56],
        "b35439a4ac6f0948b6d6f9e3c6af0f5f590ce20f1bde7090ef7970686ec6738a",
    ),
    (
        &[b'a'; 63],
        "7d3e74a05d7db15bce4ad9ec0658ea98e3f06eeecf16b4c6fff2da457ddc2f34",
    ),
    (
        &[b'a'; 64],
        "ffe054fe7ae0cb6dc65c3af9b61d5209f439851db43d0ba5997337df154668eb",
    ),
    (
        &[b'a'; 119],
        "31eba51c313a5c08226adf18d4a359cfdfd8d2e816b13f4af952f7ea6584dcfb",
    ),
    (
        &[b'a'; 120],
        "2f3d335432c70b580af0e8e1b3674a7c020d683aa5f73aaaedfdc55af904c21c",
    ),
];

#[test]
fn test_known_answers() {
    for &(input, expected) in ANSWERS.iter() {
        assert_eq!(
            hex::encode(sha256(input)),
            expected,
            "input of {} bytes",
            input.len()
        );
    }
}

#[test]
fn test_million_a() {
    let mut hasher = Hasher::new();
    let chunk = [b'a'; 1000];
    for _ in 0..1000 {
        hasher.update(&chunk);
    }
    assert_eq!(
        hex::encode(hasher.finalize()),
        "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0"
    );
}

#[test]
fn test_chunking_independence() {
    let mut rng = rand::thread_rng();
    let msg: Vec<u8> = (0..777).map(|_| rng.gen()).collect();
    let whole = sha256(&msg);

    for _ in 0..20 {
        let mut hasher = Hasher::new();
        // empty updates are no-ops
        hasher.update(&[]);
        let mut rest: &[u8] = &msg;
        while !rest.is_empty() {
            let take = rng.gen_range(1..=rest.len());
            let (head, tail) = rest.split_at(take);
            hasher.update(head);
            rest = tail;
        }
        assert_eq!(hasher.finalize(), whole);
    }
}

#[test]
fn test_update_slicing_fixed_splits() {
    let msg = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
    for split in [0, 1, 27, 55, 56] {
        let mut hasher = Hasher::new();
        hasher.update(&msg[..split]);
        hasher.update(&msg[split..]);
        assert_eq!(
            hex::encode(hasher.finalize()),
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
            "split at {}",
            split
        );
    }
}

#[test]
fn test_reset_idempotence() {
    let mut once = Hasher::new();
    once.reset();
    once.update(b"hello");

    let mut twice = Hasher::new();
    twice.reset();
    twice.reset();
    twice.update(b"hello");

    assert_eq!(once.finalize(), twice.finalize());
}

#[test]
fn test_reset_discards_fed_bytes() {
    let mut hasher = Hasher::new();
    hasher.update(b"garbage that must vanish");
    hasher.reset();
    hasher.update(b"abc");
    assert_eq!(
        hex::encode(hasher.finalize()),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_finalize_mid_stream() {
    // finalize always digests exactly the bytes fed so far
    let mut hasher = Hasher::new();
    hasher.update(b"ab");
    hasher.update(b"c");
    assert_eq!(hasher.finalize(), sha256(b"abc"));
}

#[test]
fn test_lane_equivalence() {
    let mut rng = rand::thread_rng();
    for _ in 0..8 {
        let len = rng.gen_range(0..700);
        let msg: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let reference = sha256(&msg);
        for lanes in [1, 2, 4, 8] {
            let mut hasher = Hasher::with_lanes(lanes);
            hasher.update(&msg);
            assert_eq!(
                hasher.finalize(),
                reference,
                "lanes={} len={}",
                lanes,
                len
            );
        }
    }
}

#[test]
fn test_lane_equivalence_on_vectors() {
    for &(input, expected) in ANSWERS.iter() {
        for lanes in [2, 4, 8] {
            let mut hasher = Hasher::with_lanes(lanes);
            hasher.update(input);
            assert_eq!(hex::encode(hasher.finalize()), expected, "lanes={}", lanes);
        }
    }
}

#[test]
fn test_empty_finalize() {
    // a fresh hasher finalizes to the empty-message digest
    assert_eq!(
        hex::encode(Hasher::new().finalize()),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
