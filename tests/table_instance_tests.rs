#[cfg(test)]
mod tests {
    use gridcore::table::state::{ColumnSizingState, RowPinningState, SortEntry};
    use gridcore::{ColumnDef, ExpandedState, PinSide, Table, TableState, Update};
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;

    fn people() -> Vec<JsonValue> {
        vec![
            json!({"first": "Alice", "last": "Ade", "age": 30, "city": "Austin"}),
            json!({"first": "Bob", "last": "Bell", "age": 25, "city": "Boston"}),
            json!({"first": "Cara", "last": "Cole", "age": 35, "city": "Chicago"}),
        ]
    }

    fn grouped_defs() -> Vec<ColumnDef> {
        vec![
            ColumnDef::group(
                "name",
                vec![ColumnDef::new("first"), ColumnDef::new("last")],
            ),
            ColumnDef::new("age"),
            ColumnDef::new("city"),
        ]
    }

    #[test]
    fn test_column_listings() {
        let table = Table::builder(people(), grouped_defs()).build();

        let all: Vec<String> = table.get_all_columns().iter().map(|c| c.id.clone()).collect();
        assert_eq!(all, vec!["name", "first", "last", "age", "city"]);

        let leaves: Vec<String> = table
            .get_all_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(leaves, vec!["first", "last", "age", "city"]);

        assert!(table.get_column("name").unwrap().is_group);
        assert!(!table.get_column("age").unwrap().is_group);
        assert!(table.get_column("missing").is_none());
    }

    #[test]
    fn test_visible_columns_deterministic_given_state() {
        let mut initial = TableState::default();
        initial.column_order = vec!["city".into(), "age".into()];
        initial.column_pinning.left = vec!["last".into()];
        initial.column_visibility.insert("first".into(), false);

        let table = Table::builder(people(), grouped_defs())
            .with_initial_state(initial.clone())
            .build();
        let once: Vec<String> = table
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();

        let table2 = Table::builder(people(), grouped_defs())
            .with_initial_state(initial)
            .build();
        let twice: Vec<String> = table2
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();

        assert_eq!(once, twice);
        assert_eq!(once, vec!["last", "city", "age"]);
    }

    #[test]
    fn test_header_groups_rows_and_placeholders() {
        let table = Table::builder(people(), grouped_defs()).build();
        let groups = table.get_header_groups();

        // max depth 1 -> 2 rows
        assert_eq!(groups.len(), 2);

        let top = &groups[0];
        let name = &top.headers[0];
        assert_eq!(name.column_id, "name");
        assert_eq!(name.col_span, 2);
        assert_eq!(name.row_span, 1);
        assert!(!name.is_placeholder);

        for placeholder in top.headers.iter().filter(|h| h.is_placeholder) {
            assert_eq!(placeholder.row_span, 2); // max_depth - 0 + 1
            assert_eq!(placeholder.col_span, 1);
        }
        // the two ungrouped leaves produce placeholders at the top row
        assert_eq!(top.headers.iter().filter(|h| h.is_placeholder).count(), 2);

        // every row spans all visible leaves
        for group in &groups {
            let span: usize = group.headers.iter().map(|h| h.col_span).sum();
            assert_eq!(span, 4);
        }
    }

    #[test]
    fn test_placeholder_targets_leaf_for_sorting() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        let groups = table.get_header_groups();
        let placeholder = groups[0]
            .headers
            .iter()
            .find(|h| h.is_placeholder)
            .unwrap()
            .clone();

        // toggling through the placeholder's carried column sorts the leaf
        table.toggle_sorting(&placeholder.column_id, None).unwrap();
        assert_eq!(
            table.get_state().sorting,
            vec![SortEntry {
                id: placeholder.column_id,
                desc: false
            }]
        );
    }

    #[test]
    fn test_sort_toggle_cycle_full() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        for (expected, _) in [(Some(false), "asc"), (Some(true), "desc"), (None, "off")] {
            table.toggle_sorting("age", None).unwrap();
            assert_eq!(table.get_column("age").unwrap().is_sorted, expected);
        }
    }

    #[test]
    fn test_set_sorting_enters_multi_key_mode() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        table.set_sorting(Update::set(vec![
            SortEntry { id: "last".into(), desc: false },
            SortEntry { id: "age".into(), desc: true },
        ]));
        assert_eq!(table.get_state().sorting.len(), 2);
        assert_eq!(table.get_column("age").unwrap().is_sorted, Some(true));
    }

    #[test]
    fn test_updater_round_trip_uncontrolled() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        table.set_column_sizing(Update::map(|prev: &ColumnSizingState| {
            let mut next = prev.clone();
            next.insert("age".into(), 220.0);
            next
        }));
        assert_eq!(table.get_column("age").unwrap().size, 220.0);
    }

    #[test]
    fn test_expanded_tree_flatten_scenario() {
        // Root A has children [B, C]; B has child E; D is a sibling of A.
        // DFS ids: A=0, B=1, E=2, C=3, D=4.
        let data = vec![
            json!({
                "name": "A",
                "children": [
                    {"name": "B", "children": [{"name": "E"}]},
                    {"name": "C"}
                ]
            }),
            json!({"name": "D"}),
        ];
        let mut table = Table::builder(data, vec![ColumnDef::new("name")])
            .with_sub_rows_key("children")
            .build();

        let mut expanded = ExpandedState::default();
        expanded.toggle("0", true);
        expanded.toggle("1", true);
        table.set_expanded(Update::set(expanded));

        let names: Vec<JsonValue> = table
            .get_expanded_row_model()
            .rows
            .iter()
            .map(|&i| table.arena().nodes[i].field("name"))
            .collect();
        assert_eq!(
            names,
            vec![json!("A"), json!("B"), json!("E"), json!("C"), json!("D")]
        );

        // depth and parentage exposed per row
        let b = table.get_row_by_id("1").unwrap();
        assert_eq!(b.depth, 1);
        assert_eq!(b.parent_id(table.arena()), Some("0".to_string()));
        assert!(b.can_expand());

        // expand-all then collapse returns to the root count
        table.set_expanded(Update::set(ExpandedState::all()));
        assert_eq!(table.get_expanded_row_model().rows.len(), 5);
        table.set_expanded(Update::set(ExpandedState::default()));
        assert_eq!(table.get_expanded_row_model().rows.len(), 2);
    }

    #[test]
    fn test_view_indices_reorder_rows_lazily() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        table.set_view_indices(Some(Arc::new(vec![2, 1])));
        let model = table.get_row_model();
        assert_eq!(model.rows.len(), 2);
        let firsts: Vec<JsonValue> = model
            .rows
            .iter()
            .map(|&i| table.arena().nodes[i].field("first"))
            .collect();
        assert_eq!(firsts, vec![json!("Cara"), json!("Bob")]);

        // core model is unaffected by the indirection
        assert_eq!(table.get_core_row_model().rows.len(), 3);
    }

    #[test]
    fn test_get_row_bounds_error() {
        let table = Table::builder(people(), grouped_defs()).build();
        assert!(table.get_row(0).is_ok());
        assert!(table.get_row(3).is_err());
    }

    #[test]
    fn test_row_pinning_round_trip() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        table.set_row_pinning(Update::set(RowPinningState {
            top: vec!["1".into()],
            bottom: vec!["0".into()],
        }));
        assert_eq!(table.get_top_rows(), vec![1]);
        assert_eq!(table.get_center_rows(), vec![2]);
        assert_eq!(table.get_bottom_rows(), vec![0]);

        table.reset_row_pinning();
        assert!(table.get_top_rows().is_empty());
        assert_eq!(table.get_center_rows().len(), 3);
    }

    #[test]
    fn test_csv_escape_scenario() {
        // cells [["a,b","c"], ["d"e","f"]] export with the doubling rule
        let data = vec![
            json!({"x": "a,b", "y": "c"}),
            json!({"x": "d\"e", "y": "f"}),
        ];
        let table = Table::builder(data, vec![ColumnDef::new("x"), ColumnDef::new("y")]).build();
        let csv = table.to_csv();
        let body = csv.split_once('\n').unwrap().1;
        assert_eq!(body, "\"a,b\",c\n\"d\"\"e\",f");
    }

    #[test]
    fn test_pin_through_column_api_feeds_layout() {
        let mut table = Table::builder(people(), grouped_defs()).build();
        table.pin_column("city", Some(PinSide::Left)).unwrap();
        table.pin_column("first", Some(PinSide::Right)).unwrap();

        let visible: Vec<String> = table
            .get_visible_leaf_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(visible, vec!["city", "last", "age", "first"]);

        let (columns, pinning) = table.layout_columns();
        assert_eq!(columns.len(), 4);
        assert_eq!(pinning.left_count, 1);
        assert_eq!(pinning.right_count, 1);
    }
}
