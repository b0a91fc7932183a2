use husk_core::{LineIndex, TextSize};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_char() -> impl Strategy<Value = char> {
    prop_oneof![
        12 => prop::sample::select(vec![
            'a', 'b', 'c', 'x', '{', '}', ';', ' ', '\t', '.', ',',
        ]),
        3 => Just('\n'),
        2 => Just('\r'),
        2 => Just('é'),
        2 => Just('中'),
        1 => Just('😀'),
    ]
}

fn arb_text_and_offset() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(arb_char(), 0..=64)
        .prop_map(|chars| chars.into_iter().collect::<String>())
        .prop_flat_map(|text| {
            let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
            boundaries.push(text.len());
            (Just(text), prop::sample::select(boundaries))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn line_col_roundtrips_for_offsets_outside_line_breaks((text, offset) in arb_text_and_offset()) {
        let index = LineIndex::new(&text);
        let size = TextSize::from(offset as u32);
        let line_col = index.line_col(size);

        // Offsets inside a `\r\n` pair are clamped to the end of the line.
        let in_crlf = offset > 0
            && text.as_bytes().get(offset - 1) == Some(&b'\r')
            && text.as_bytes().get(offset) == Some(&b'\n');
        if !in_crlf {
            prop_assert_eq!(index.offset(line_col), Some(size));
        }
        prop_assert!(line_col.line < index.line_count());
    }
}
