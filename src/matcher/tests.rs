use super::*;
use crate::document::{MAX_DEPTH, parse_str};
use crate::model::{Filter, Manifest};
use crate::syntax::{check_filter, check_manifest};
use crate::tags::TagRegistry;
use pretty_assertions::assert_eq;

fn filter(xml: &str) -> Filter {
    check_filter(&parse_str(xml).unwrap()).unwrap()
}

fn manifest(xml: &str) -> Manifest {
    check_manifest(&parse_str(xml).unwrap()).unwrap()
}

fn registry(definitions: &[(&str, &str)]) -> TagRegistry {
    TagRegistry::from_definitions(
        definitions
            .iter()
            .map(|(name, xml)| (name.to_string(), filter(xml))),
    )
    .unwrap()
}

fn run(filter_xml: &str, manifest_xml: &str) -> MatchResult {
    match_manifest(&filter(filter_xml), &manifest(manifest_xml), &TagRegistry::new())
}

fn kind_of(filter_xml: &str, manifest_xml: &str) -> MatchFailureKind {
    run(filter_xml, manifest_xml).unwrap_err().kind
}

fn data_greater_than(n: i64) -> String {
    format!(r#"<dict filter="all"><named-field name="data"><int filter="gt">{n}</int></named-field></dict>"#)
}

#[test]
fn numeric_comparison_puts_manifest_on_the_left() {
    assert_eq!(
        kind_of(r#"<int filter="lt">3</int>"#, "<int>3</int>"),
        MatchFailureKind::NumericFailedComparison
    );
    assert!(run(r#"<int filter="lt">3</int>"#, "<int>2</int>").is_ok());
    assert!(run(r#"<float filter="ge">0.5</float>"#, "<float>0.75</float>").is_ok());
    assert!(run(r#"<int filter="none"/>"#, "<int>-7</int>").is_ok());
}

#[test]
fn dict_filters_accept_supersets() {
    let filter_xml = r#"<dict filter="all">
  <named-field name="x"><string filter="equals">k</string></named-field>
</dict>"#;
    let manifest_xml = r#"<dict>
  <named-field name="x"><string>k</string></named-field>
  <named-field name="y"><int>1</int></named-field>
</dict>"#;
    assert_eq!(run(filter_xml, manifest_xml), Ok(()));
}

#[test]
fn dict_reports_missing_key_at_the_field() {
    let failure = run(
        "<dict filter=\"all\">\n<named-field name=\"z\"><int filter=\"none\"/></named-field>\n</dict>",
        "<dict>\n<named-field name=\"y\"><int>1</int></named-field>\n</dict>",
    )
    .unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::DictMissingKey);
    assert_eq!((failure.filter_line, failure.manifest_line), (2, 1));
}

#[test]
fn tag_identity_is_checked_first() {
    let failure = run(r#"<string filter="equals">3</string>"#, "<int>3</int>").unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagMismatch);
    assert_eq!(failure.detail.as_deref(), Some("expected <string>, found <int>"));
}

#[test]
fn list_prefix_is_matched_in_order() {
    let filter_xml = r#"<list filter="all"><int filter="equals">1</int><int filter="equals">2</int></list>"#;
    assert!(run(filter_xml, "<list><int>1</int><int>2</int><int>3</int></list>").is_ok());
    assert_eq!(
        kind_of(filter_xml, "<list><int>1</int></list>"),
        MatchFailureKind::ListInsufficientChildren
    );
    assert_eq!(
        kind_of(filter_xml, "<list><int>2</int><int>1</int></list>"),
        MatchFailureKind::NumericFailedComparison
    );
}

#[test]
fn string_and_bool_equality() {
    assert!(run(r#"<string filter="equals">resnet</string>"#, "<string> resnet </string>").is_ok());
    assert_eq!(
        kind_of(r#"<string filter="equals">resnet</string>"#, "<string>vgg</string>"),
        MatchFailureKind::StringValueNotEqual
    );
    assert!(run(r#"<bool filter="equals">1</bool>"#, "<bool>TRUE</bool>").is_ok());
    assert_eq!(
        kind_of(r#"<bool filter="equals">true</bool>"#, "<bool>0</bool>"),
        MatchFailureKind::BoolValueNotEqual
    );
}

#[test]
fn unfilled_fails_every_comparison() {
    assert_eq!(
        kind_of(r#"<string filter="equals">unfilled</string>"#, "<string>unfilled</string>"),
        MatchFailureKind::StringValueNotEqual
    );
    assert_eq!(
        kind_of(r#"<int filter="ge">0</int>"#, "<int>unfilled</int>"),
        MatchFailureKind::NumericFailedComparison
    );
    assert_eq!(
        kind_of(r#"<bool filter="equals">false</bool>"#, "<bool>unfilled</bool>"),
        MatchFailureKind::BoolValueNotEqual
    );
    assert!(run(r#"<float filter="none"/>"#, "<float>unfilled</float>").is_ok());
}

#[test]
fn or_fails_at_the_logical_node() {
    let filter_xml = "<logical filter=\"or\">\n<string filter=\"equals\">a</string>\n<string filter=\"equals\">b</string>\n</logical>";
    let failure = run(filter_xml, "<string>c</string>").unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::LogicalOperationMatchFailure);
    assert_eq!((failure.filter_line, failure.manifest_line), (1, 1));
    assert!(run(filter_xml, "<string>b</string>").is_ok());
}

#[test]
fn and_and_not_compose() {
    let range = r#"<logical filter="and"><int filter="ge">1</int><int filter="lt">10</int></logical>"#;
    assert!(run(range, "<int>1</int>").is_ok());
    assert_eq!(kind_of(range, "<int>10</int>"), MatchFailureKind::NumericFailedComparison);

    let not = r#"<logical filter="not"><string filter="equals">a</string></logical>"#;
    assert!(run(not, "<string>b</string>").is_ok());
    assert_eq!(kind_of(not, "<string>a</string>"), MatchFailureKind::LogicalOperationMatchFailure);
}

#[test]
fn double_negation_is_identity() {
    let inner = r#"<int filter="gt">2</int>"#;
    let double = format!(r#"<logical filter="not"><logical filter="not">{inner}</logical></logical>"#);
    for value in ["<int>1</int>", "<int>2</int>", "<int>3</int>", "<string>x</string>"] {
        assert_eq!(run(&double, value).is_ok(), run(inner, value).is_ok(), "{value}");
    }
}

#[test]
fn explicit_tags_must_be_declared() {
    let filter_xml = r#"<tag-collection filter="explicit-tag-match">
  <condensed-tags>vision::cnn</condensed-tags>
</tag-collection>"#;
    assert!(run(
        filter_xml,
        "<tag-collection><condensed-tags>vision.{cnn, rnn}</condensed-tags></tag-collection>"
    )
    .is_ok());
    let failure = run(
        filter_xml,
        "<tag-collection><condensed-tags>vision::rnn</condensed-tags></tag-collection>",
    )
    .unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagCollectionExplicitTagMatchFailure);
    assert_eq!(failure.detail.as_deref(), Some("manifest does not declare vision::cnn"));
}

#[test]
fn type_declarations_match_structurally() {
    let filter_xml = r#"<type-declaration filter="type-match">
  <type-tuple filter="all">
    <type-int/>
    <type-list filter="all"><type-string/></type-list>
  </type-tuple>
</type-declaration>"#;
    let ok = r#"<type-declaration>
  <type-tuple><type-int/><type-list><type-string/></type-list></type-tuple>
</type-declaration>"#;
    assert!(run(filter_xml, ok).is_ok());

    let short = "<type-declaration><type-tuple><type-int/></type-tuple></type-declaration>";
    assert_eq!(
        kind_of(filter_xml, short),
        MatchFailureKind::TypeDeclarationTupleIncorrectChildrenCount
    );

    let wrong = r#"<type-declaration>
  <type-tuple><type-int/><type-list><type-bool/></type-list></type-tuple>
</type-declaration>"#;
    let failure = run(filter_xml, wrong).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagMismatch);
    assert_eq!((failure.filter_line, failure.manifest_line), (4, 2));
}

#[test]
fn tensor_dims_are_compared_in_order() {
    let filter_xml = r#"<type-declaration filter="type-match">
  <type-tensor filter="all">
    <dim filter="equals">3</dim>
    <logical filter="or"><dim filter="equals">224</dim><dim filter="equals">256</dim></logical>
  </type-tensor>
</type-declaration>"#;
    let tensor = |dims: &str| format!("<type-declaration><type-tensor>{dims}</type-tensor></type-declaration>");

    assert!(run(filter_xml, &tensor("<dim>3</dim><dim>256</dim>")).is_ok());
    assert_eq!(
        kind_of(filter_xml, &tensor("<dim>3</dim>")),
        MatchFailureKind::TypeDeclarationTensorDifferentDimNumber
    );
    assert_eq!(
        kind_of(filter_xml, &tensor("<dim>1</dim><dim>224</dim>")),
        MatchFailureKind::TypeDeclarationDimFailedComparison
    );
    assert_eq!(
        kind_of(filter_xml, &tensor("<dim>3</dim><dim>100</dim>")),
        MatchFailureKind::LogicalOperationMatchFailure
    );
    assert_eq!(
        kind_of(filter_xml, &tensor("<dim>unfilled</dim><dim>224</dim>")),
        MatchFailureKind::TypeDeclarationDimFailedComparison
    );
}

#[test]
fn named_value_collections_need_equal_keys() {
    let filter_xml = r#"<type-declaration filter="type-match">
  <type-named-value-collection filter="all">
    <type-named-value name="logits"><type-float/></type-named-value>
  </type-named-value-collection>
</type-declaration>"#;
    let exact = r#"<type-declaration><type-named-value-collection>
  <type-named-value name="logits"><type-float/></type-named-value>
</type-named-value-collection></type-declaration>"#;
    let wider = r#"<type-declaration><type-named-value-collection>
  <type-named-value name="logits"><type-float/></type-named-value>
  <type-named-value name="labels"><type-string/></type-named-value>
</type-named-value-collection></type-declaration>"#;

    assert!(run(filter_xml, exact).is_ok());
    let failure = run(filter_xml, wider).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TypeDeclarationNamedValueCollectionDifferentKeys);
    assert_eq!(failure.detail.as_deref(), Some("missing [], unexpected [labels]"));
}

#[test]
fn implicit_tags_resolve_against_the_root() {
    let registry = registry(&[
        ("gt1", data_greater_than(1).as_str()),
        ("gt1::gt2", data_greater_than(2).as_str()),
        ("gt1::gt2::gt3", data_greater_than(3).as_str()),
        (
            "big",
            r#"<tag-collection filter="implicit-tag-match"><condensed-tags>gt1.gt2.gt3</condensed-tags></tag-collection>"#,
        ),
    ]);
    let query = filter(
        r#"<tag-collection filter="implicit-tag-match"><condensed-tags>big</condensed-tags></tag-collection>"#,
    );
    let model = manifest(
        "<dict>\n<named-field name=\"data\">\n<int>3</int>\n</named-field>\n</dict>",
    );

    let failure = match_manifest(&query, &model, &registry).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::NumericFailedComparison);
    assert_eq!(failure.tag_stack, vec!["big".to_string(), "gt1::gt2::gt3".to_string()]);
    assert_eq!(failure.manifest_line, 3);

    let bigger = manifest(r#"<dict><named-field name="data"><int>4</int></named-field></dict>"#);
    assert_eq!(match_manifest(&query, &bigger, &registry), Ok(()));
}

#[test]
fn implicit_tags_inside_a_dict_still_see_the_root() {
    let registry = registry(&[("gt1", data_greater_than(1).as_str())]);
    let query = filter(
        r#"<dict filter="all"><named-field name="tags">
  <tag-collection filter="implicit-tag-match"><condensed-tags>gt1</condensed-tags></tag-collection>
</named-field></dict>"#,
    );
    let model = manifest(
        r#"<dict>
  <named-field name="data"><int>2</int></named-field>
  <named-field name="tags"><tag-collection><condensed-tags>gt1</condensed-tags></tag-collection></named-field>
</dict>"#,
    );
    assert_eq!(match_manifest(&query, &model, &registry), Ok(()));
}

#[test]
fn unknown_tags_are_reported() {
    let query = filter(
        r#"<tag-collection filter="implicit-tag-match"><condensed-tags>ghost</condensed-tags></tag-collection>"#,
    );
    let failure = match_manifest(&query, &manifest("<dict/>"), &TagRegistry::new()).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagNotFound);
    assert!(failure.tag_stack.is_empty());
}

fn cyclic_registry() -> TagRegistry {
    registry(&[
        (
            "a",
            r#"<tag-collection filter="implicit-tag-match"><condensed-tags>b</condensed-tags></tag-collection>"#,
        ),
        (
            "b",
            r#"<tag-collection filter="implicit-tag-match"><condensed-tags>a</condensed-tags></tag-collection>"#,
        ),
    ])
}

#[test]
fn cycles_are_detected() {
    let failure = match_tag("a", &manifest("<dict/>"), &cyclic_registry()).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagCycle);
    assert_eq!(failure.tag_stack, vec!["a", "b", "a"]);
}

#[test]
fn not_does_not_turn_a_cycle_into_a_match() {
    let query = filter(
        r#"<logical filter="not"><tag-collection filter="implicit-tag-match"><condensed-tags>a</condensed-tags></tag-collection></logical>"#,
    );
    let failure = match_manifest(&query, &manifest("<dict/>"), &cyclic_registry()).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagCycle);
    assert_eq!(failure.tag_stack, vec!["a", "b", "a"]);
}

#[test]
fn or_passes_registry_faults_through() {
    let ghost = r#"<tag-collection filter="implicit-tag-match"><condensed-tags>ghost</condensed-tags></tag-collection>"#;
    let query = filter(&format!(r#"<logical filter="or">{ghost}<dict filter="none"/></logical>"#));
    let failure = match_manifest(&query, &manifest("<dict/>"), &TagRegistry::new()).unwrap_err();
    assert_eq!(failure.kind, MatchFailureKind::TagNotFound);

    // An earlier alternative that matches still short-circuits.
    let query = filter(&format!(r#"<logical filter="or"><dict filter="none"/>{ghost}</logical>"#));
    assert_eq!(match_manifest(&query, &manifest("<dict/>"), &TagRegistry::new()), Ok(()));
}

/// Filters on one line, so duplicated operands report identical failures.
const LAW_FILTERS: &[&str] = &[
    r#"<int filter="gt">2</int>"#,
    r#"<int filter="le">2</int>"#,
    r#"<int filter="none"/>"#,
    r#"<string filter="equals">x</string>"#,
    r#"<logical filter="not"><int filter="equals">3</int></logical>"#,
    r#"<list filter="all"><int filter="ge">0</int></list>"#,
];

const LAW_MANIFESTS: &[&str] = &[
    "<int>1</int>",
    "<int>2</int>",
    "<int>3</int>",
    "<int>unfilled</int>",
    "<string>x</string>",
    "<list><int>4</int></list>",
    "<list/>",
];

#[test]
fn and_with_itself_is_the_operand() {
    for f in LAW_FILTERS {
        let doubled = format!(r#"<logical filter="and">{f}{f}</logical>"#);
        for m in LAW_MANIFESTS {
            assert_eq!(run(&doubled, m), run(f, m), "and({f}, {f}) on {m}");
        }
    }
}

#[test]
fn or_matches_iff_an_operand_matches() {
    for f in LAW_FILTERS {
        for g in LAW_FILTERS {
            let either = format!(r#"<logical filter="or">{f}{g}</logical>"#);
            for m in LAW_MANIFESTS {
                let expected = run(f, m).is_ok() || run(g, m).is_ok();
                assert_eq!(run(&either, m).is_ok(), expected, "or({f}, {g}) on {m}");
            }
        }
    }
}

#[test]
fn none_filters_match_every_node_with_their_tag() {
    let table = [
        (r#"<dict filter="none"/>"#, r#"<dict><named-field name="k"><int>1</int></named-field></dict>"#),
        (r#"<list filter="none"/>"#, "<list><string>a</string><list/></list>"),
        (r#"<string filter="none"/>"#, "<string>unfilled</string>"),
        (r#"<bool filter="none"/>"#, "<bool>FALSE</bool>"),
        (r#"<int filter="none"/>"#, "<int>unfilled</int>"),
        (r#"<float filter="none"/>"#, "<float>-1e9</float>"),
        (
            r#"<type-declaration filter="none"/>"#,
            "<type-declaration><type-tensor><dim>unfilled</dim></type-tensor></type-declaration>",
        ),
        (
            r#"<tag-collection filter="none"/>"#,
            "<tag-collection><condensed-tags>a.b</condensed-tags></tag-collection>",
        ),
        (
            r#"<type-declaration filter="type-match"><type-tuple filter="none"/></type-declaration>"#,
            "<type-declaration><type-tuple><type-int/><type-float/></type-tuple></type-declaration>",
        ),
        (
            r#"<type-declaration filter="type-match"><type-named-value-collection filter="none"/></type-declaration>"#,
            "<type-declaration><type-named-value-collection/></type-declaration>",
        ),
    ];
    for (filter_xml, manifest_xml) in table {
        assert_eq!(run(filter_xml, manifest_xml), Ok(()), "{filter_xml} on {manifest_xml}");
    }

    // Nested: an all-`none` dict accepts any values under the named keys.
    let shape = r#"<dict filter="all">
  <named-field name="name"><string filter="none"/></named-field>
  <named-field name="layers"><list filter="none"/></named-field>
</dict>"#;
    for (name, layers) in [("a", "<list/>"), ("unfilled", "<list><int>1</int></list>")] {
        let model = format!(
            r#"<dict><named-field name="layers">{layers}</named-field><named-field name="name"><string>{name}</string></named-field></dict>"#
        );
        assert_eq!(run(shape, &model), Ok(()), "{model}");
    }
}

#[test]
fn tensor_arity_is_strict_whatever_the_dims() {
    let tensor = |dims: &str| format!("<type-declaration><type-tensor>{dims}</type-tensor></type-declaration>");
    let any_two = r#"<type-declaration filter="type-match"><type-tensor filter="all">
  <dim filter="none"/><dim filter="none"/>
</type-tensor></type-declaration>"#;
    let positive_two = r#"<type-declaration filter="type-match"><type-tensor filter="all">
  <dim filter="ge">0</dim><dim filter="ge">0</dim>
</type-tensor></type-declaration>"#;

    for filter_xml in [any_two, positive_two] {
        assert!(run(filter_xml, &tensor("<dim>3</dim><dim>4</dim>")).is_ok());
        for dims in ["", "<dim>3</dim>", "<dim>3</dim><dim>4</dim><dim>5</dim>"] {
            assert_eq!(
                kind_of(filter_xml, &tensor(dims)),
                MatchFailureKind::TypeDeclarationTensorDifferentDimNumber,
                "{dims}"
            );
        }
    }
}

#[test]
fn deepest_documents_fit_a_spawned_thread() {
    // `not` chains as deep as the loader allows, one as a query and one as a
    // tag definition resolved from inside another near-limit chain.
    let chain = |nots: usize, leaf: &str| {
        format!(
            "{}{}{}",
            r#"<logical filter="not">"#.repeat(nots),
            leaf,
            "</logical>".repeat(nots)
        )
    };
    let deepest = chain(MAX_DEPTH - 1, r#"<int filter="gt">2</int>"#);
    let via_tag = chain(
        MAX_DEPTH - 2,
        r#"<tag-collection filter="implicit-tag-match"><condensed-tags>deep</condensed-tags></tag-collection>"#,
    );

    std::thread::spawn(move || {
        let query = check_filter(&parse_str(&deepest).unwrap()).unwrap();
        assert_eq!(query.depth(), MAX_DEPTH);
        let registry = TagRegistry::from_definitions([("deep".to_string(), query.clone())]).unwrap();
        let small = manifest("<int>1</int>");
        let large = manifest("<int>3</int>");

        // An odd number of negations flips the comparison.
        assert_eq!(match_manifest(&query, &small, &registry), Ok(()));
        assert_eq!(
            match_manifest(&query, &large, &registry).unwrap_err().kind,
            MatchFailureKind::LogicalOperationMatchFailure
        );

        let outer = check_filter(&parse_str(&via_tag).unwrap()).unwrap();
        assert_eq!(match_manifest(&outer, &small, &registry), Ok(()));
        assert!(match_manifest(&outer, &large, &registry).is_err());
    })
    .join()
    .unwrap();
}

#[test]
fn match_tag_pushes_the_tag() {
    let registry = registry(&[("gt1", data_greater_than(1).as_str())]);
    let model = manifest(r#"<dict><named-field name="data"><int>0</int></named-field></dict>"#);
    let failure = match_tag("gt1", &model, &registry).unwrap_err();
    assert_eq!(failure.tag_stack, vec!["gt1"]);
    assert_eq!(failure.kind, MatchFailureKind::NumericFailedComparison);
}

#[test]
fn matching_is_deterministic() {
    let query = filter(
        r#"<dict filter="all">
  <named-field name="a"><int filter="gt">5</int></named-field>
  <named-field name="b"><string filter="equals">x</string></named-field>
</dict>"#,
    );
    let model = manifest(
        r#"<dict>
  <named-field name="b"><string>y</string></named-field>
  <named-field name="a"><int>1</int></named-field>
</dict>"#,
    );
    let registry = TagRegistry::new();
    let first = match_manifest(&query, &model, &registry);
    assert_eq!(first.as_ref().unwrap_err().kind, MatchFailureKind::NumericFailedComparison);
    for _ in 0..5 {
        assert_eq!(match_manifest(&query, &model, &registry), first);
    }
}
