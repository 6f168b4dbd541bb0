//! List endpoints return the standardized envelope with `data` and
//! `pagination` fields containing proper metadata.

use serde_json::Value;

#[test]
fn test_list_response_structure() {
    // Expected format:
    // {
    //   "data": [...],           // Array of items
    //   "pagination": {
    //     "total": 100,          // Total items across all pages
    //     "limit": 50,           // Items per page
    //     "offset": 0,           // Number of items skipped
    //     "has_more": true       // Whether more items are available
    //   }
    // }
    let response_json = r#"
    {
      "data": [
        {"id": "0198c0de-0000-7000-8000-000000000001", "original_filename": "a.pdf"},
        {"id": "0198c0de-0000-7000-8000-000000000002", "original_filename": "b.pdf"}
      ],
      "pagination": {
        "total": 10,
        "limit": 5,
        "offset": 0,
        "has_more": true
      }
    }
    "#;

    let response: Value = serde_json::from_str(response_json).expect("Valid JSON");

    assert!(response.get("data").is_some(), "Response must have 'data'");
    assert!(response["data"].is_array(), "'data' must be an array");

    let pagination = response
        .get("pagination")
        .expect("Response must have 'pagination'");
    for field in ["total", "limit", "offset", "has_more"] {
        assert!(
            pagination.get(field).is_some(),
            "Pagination must have '{}'",
            field
        );
    }
    assert!(pagination["total"].is_number());
    assert!(pagination["limit"].is_number());
    assert!(pagination["offset"].is_number());
    assert!(pagination["has_more"].is_boolean());
}

#[test]
fn test_has_more_semantics() {
    // has_more is true exactly when offset + page length < total.
    let cases = [
        (0i64, 5usize, 10i64, true),
        (5, 5, 10, false),
        (0, 10, 10, false),
        (8, 2, 10, false),
        (0, 0, 0, false),
    ];
    for (offset, page_len, total, expected) in cases {
        let has_more = offset + (page_len as i64) < total;
        assert_eq!(
            has_more, expected,
            "offset={} page_len={} total={}",
            offset, page_len, total
        );
    }
}
