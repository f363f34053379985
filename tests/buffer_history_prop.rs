//! TextBuffer public API property tests
//!
//! These exercise only the exposed methods against a plain string model so
//! downstream integrations can rely on stable behaviour.

use proptest::test_runner::Config as ProptestConfig;
use proptest::{prelude::*, prop_oneof};

use tsuzuri::{Edit, EditRange, Position, TextBuffer};

#[derive(Debug, Clone)]
enum Operation {
    Insert {
        line: usize,
        column: usize,
        text: String,
    },
    Delete {
        line: usize,
        column: usize,
        len: usize,
    },
    Replace {
        line: usize,
        column: usize,
        len: usize,
        text: String,
    },
}

fn small_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop::sample::select(vec![
            'a', 'b', 'z', '0', '9', ' ', '#', '\'', '_', 'あ', '\n',
        ]),
        0..24,
    )
    .prop_map(|chars| chars.into_iter().collect::<String>())
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let insert = (0usize..8, 0usize..16, small_text()).prop_map(|(line, column, text)| {
        Operation::Insert { line, column, text }
    });
    let delete = (0usize..8, 0usize..16, 0usize..10).prop_map(|(line, column, len)| {
        Operation::Delete { line, column, len }
    });
    let replace = (0usize..8, 0usize..16, 0usize..10, small_text()).prop_map(
        |(line, column, len, text)| Operation::Replace {
            line,
            column,
            len,
            text,
        },
    );

    prop_oneof![insert, delete, replace]
}

fn char_to_byte_index(s: &str, char_pos: usize) -> usize {
    s.char_indices()
        .nth(char_pos)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// バッファに適用するEditを組み立て、同じ変更を文字列モデルにも適用する
fn build_edit(buffer: &TextBuffer, model: &mut String, op: &Operation) -> Edit {
    let document = buffer.document();
    let (start, end, text) = match op {
        Operation::Insert { line, column, text } => {
            let start = document.clamp_position(Position::new(*line, *column));
            (start, start, text.clone())
        }
        Operation::Delete { line, column, len } => {
            let start = document.clamp_position(Position::new(*line, *column));
            let offset = document.offset_at_position(start).unwrap();
            let end = document.position_at_offset(offset + len);
            (start, end, String::new())
        }
        Operation::Replace {
            line,
            column,
            len,
            text,
        } => {
            let start = document.clamp_position(Position::new(*line, *column));
            let offset = document.offset_at_position(start).unwrap();
            let end = document.position_at_offset(offset + len);
            (start, end, text.clone())
        }
    };

    let start_offset = document.offset_at_position(start).unwrap();
    let end_offset = document.offset_at_position(end).unwrap();
    let byte_start = char_to_byte_index(model, start_offset);
    let byte_end = char_to_byte_index(model, end_offset);
    model.replace_range(byte_start..byte_end, &text);

    Edit::replace(EditRange::new(start, end), text)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn buffer_matches_string_model(
        initial in small_text(),
        ops in proptest::collection::vec(operation_strategy(), 0..16)
    ) {
        let mut buffer = TextBuffer::from_text(&initial);
        let mut model = buffer.text();

        for op in &ops {
            let edit = build_edit(&buffer, &mut model, op);
            buffer.apply(edit).unwrap();
            prop_assert_eq!(buffer.text(), model.clone());
        }
    }

    #[test]
    fn undo_all_restores_initial_content(
        initial in small_text(),
        ops in proptest::collection::vec(operation_strategy(), 0..16)
    ) {
        let mut buffer = TextBuffer::from_text(&initial);
        let original = buffer.text();
        let mut model = buffer.text();

        for op in &ops {
            let edit = build_edit(&buffer, &mut model, op);
            buffer.apply(edit).unwrap();
        }

        while buffer.undo().unwrap().is_some() {}
        prop_assert_eq!(buffer.text(), original);
        prop_assert!(!buffer.can_undo());
    }

    #[test]
    fn redo_all_reproduces_final_content(
        initial in small_text(),
        ops in proptest::collection::vec(operation_strategy(), 0..16)
    ) {
        let mut buffer = TextBuffer::from_text(&initial);
        let mut model = buffer.text();

        for op in &ops {
            let edit = build_edit(&buffer, &mut model, op);
            buffer.apply(edit).unwrap();
        }
        let final_text = buffer.text();

        while buffer.undo().unwrap().is_some() {}
        while buffer.redo().unwrap().is_some() {}
        prop_assert_eq!(buffer.text(), final_text);
    }
}
