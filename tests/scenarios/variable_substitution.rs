//! Test: Variable Substitution - prompts see the message and earlier results

use crate::helpers::*;

#[tokio::test]
async fn test_two_step_substitution() {
    let steps = vec![
        step("summary", 0, "Summarize: {message_content}"),
        step(
            "reply",
            1,
            "Email: {message_content}\nSummary: {summary_output}\nShort: {summary_summary}",
        ),
    ];
    let llm = MockLlm::new(vec![reply("A long summary", "Short"), reply("Done", "Done")]);
    let mut h = harness(llm);

    h.runner.run("Hi there", &steps, &api()).await.unwrap();

    let prompts = h.llm.prompts();
    assert_eq!(prompts[0], "Summarize: Hi there\n\nBe brief");
    assert_eq!(
        prompts[1],
        "Email: Hi there\nSummary: A long summary\nShort: Short\n\nBe brief"
    );
}

#[tokio::test]
async fn test_every_occurrence_is_replaced() {
    let steps = vec![
        step("a", 0, "x"),
        step("b", 1, "{a_output} | {a_output} | {message_content} | {message_content}"),
    ];
    let mut h = harness(MockLlm::new(vec![reply("A", "s"), reply("B", "s")]));

    h.runner.run("M", &steps, &api()).await.unwrap();

    assert!(h.llm.prompts()[1].starts_with("A | A | M | M"));
}

#[tokio::test]
async fn test_later_and_unknown_references_stay_literal() {
    let steps = vec![
        step("first", 0, "Uses {second_output} and {nobody_summary}"),
        step("second", 1, "x"),
    ];
    let mut h = harness(MockLlm::new(vec![reply("1", "1"), reply("2", "2")]));

    h.runner.run("M", &steps, &api()).await.unwrap();

    assert!(h.llm.prompts()[0].starts_with("Uses {second_output} and {nobody_summary}"));
}

#[tokio::test]
async fn test_steps_run_by_position_not_slice_order() {
    let steps = vec![
        step("late", 1, "late uses {early_output}"),
        step("early", 0, "early"),
    ];
    let mut h = harness(MockLlm::new(vec![reply("E", "e"), reply("L", "l")]));

    let outcome = h.runner.run("M", &steps, &api()).await.unwrap();

    let prompts = h.llm.prompts();
    assert!(prompts[0].starts_with("early"));
    assert!(prompts[1].starts_with("late uses E"));
    assert_eq!(outcome.results.output("late"), Some("L"));
}

#[tokio::test]
async fn test_message_text_is_not_rescanned() {
    let steps = vec![step("a", 0, "x"), step("b", 1, "{message_content}")];
    let mut h = harness(MockLlm::new(vec![reply("A", "s"), reply("B", "s")]));

    h.runner.run("quote {a_output} verbatim", &steps, &api()).await.unwrap();

    assert!(h.llm.prompts()[1].starts_with("quote {a_output} verbatim"));
}
