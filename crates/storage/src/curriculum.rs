//! Default data-structures curriculum used to seed an empty catalog.

use study_core::model::{NewTopic, Section, SectionId, TopicId, TopicText};

use crate::repository::{CatalogRepository, StorageError};

pub struct SeedSection {
    pub title: &'static str,
    pub emoji: &'static str,
    pub topics: &'static [&'static str],
}

pub const DEFAULT_CURRICULUM: &[SeedSection] = &[
    SeedSection {
        title: "Until 25/08",
        emoji: "📘",
        topics: &[
            "What is data structure",
            "Modular Programming",
            "Basic Data Types (int, float, char, bool) - read about binary representation as well",
            "Structures (struct) and Unions (union)",
            "Types of Datatypes — Primitive / Non-primitive (Abstract): {Sequential, Linked → {Linear, Non-linear}}",
            "Memory concepts — Word, Address, Range, Register, Scope, MAR, MBR, RAM, ROM",
            "Operations on Data Structures (Create, Update, Access, Deallocate)",
            "Errors — Compile time and Runtime",
            "Non-Primitive Datatypes — Array (1D, 2D {Row/Column Major}, Addressing Function), Stack, Queue, Record (Flatfile, Database)",
            "Algorithm and its Properties, Flowchart",
            "Algorithmic Constructs",
            "Functions and Procedures, Macro and Micro Operations (T State)",
            "Format of Algorithms",
            "Stack Operations — PUSH, POP, PEEP, CHANGE",
            "Stack Overflow & Underflow; Usage (Recursion, Expression Evaluation, String Ops)",
            "Program Counter (PC)",
            "Infix & Postfix (Reverse Polish Notation), Conversion",
            "Computer Architecture — Registers {Multiple, Dedicated, Stack Machine}",
            "Assembly — Opcodes (MOV, STO, ADD, SUB, MUL, DIV, BRN, JMP)",
        ],
    },
    SeedSection {
        title: "Until 24/09",
        emoji: "📗",
        topics: &[
            "Queues — Operations {Enqueue, Dequeue}, Circular Queue, Job Scheduling",
            "Priority Queues, Multilevel Queues (17/09)",
            "Linked Lists: Types {Single, Double} × {Ordered, Circular}",
            "Structure Node, Linking Nodes, Header Node",
            "Create a new list, Insert/Delete (Start, Middle, End), Search",
            "Double Ended Queue (Deque)",
            "Linear and Non-linear Data Structures",
            "Tree Terminologies {Root, Parent, Child, Leaf}",
            "Binary Trees, Tree Traversal (Pre-order, In-order, Post-order)",
            "Graph — Vertices, Edges, Loops, Cycles, Adjacency Matrix, BFS, DFS, TSP, Multigraph",
            "Heap — Min/Max Heap, Insertion, Applications",
            "Sorting — Stable/Unstable, In-place/Auxiliary",
            "Searching — Comparison/Distribution Based",
            "Hash Table (x mod m), Collision Handling via Chaining",
            "Algorithm Analysis — Time (Best/Worst/Average), Space",
            "Binary Search Tree, Balanced BST",
            "Sorting Algorithms — Bubble, Selection, Insertion, Merge",
        ],
    },
    SeedSection {
        title: "After CT2",
        emoji: "📙",
        topics: &[
            "Files — Sequential & Random Access",
            "Access Time (Latency)",
            "Allocation — Contiguous, Linked, Indexed",
            "Fragmentation — Internal & External",
            "Input/Output Stream, File Stream",
            "Threaded Binary Trees — Single, Double",
            "Tables — Implementation via 2D Array, Hash, Symbol, Database Table",
            "Data Structure: Set",
            "Templates (C++, Java) - unclear coverage",
        ],
    },
    SeedSection {
        title: "Algorithms Covered in Class",
        emoji: "🧩",
        topics: &[
            "Algorithm Sum(A, B)",
            "Algorithm PUSH(S, X)",
            "Function POP(S)",
            "Function PEEP(S, I)",
            "Algorithm Factorial(N)",
            "Algorithm: Convert Infix → Postfix",
            "Algorithm: Evaluate Postfix",
            "Assembly for Infix→Postfix (General Purpose + Stack Machine)",
            "Assembly for Postfix Evaluation (Stack Machine)",
            "Algorithm ENQUEUE / DEQUEUE",
            "Linked List Functions — InsertFirst/Last/Middle, DeleteFirst/Last/Middle (SLL/DLL)",
            "UNSOLVED: Copy a given list",
            "UNSOLVED: Check if list is sorted",
            "UNSOLVED: Search for element",
            "UNSOLVED: Insert node in order (recursive & non-recursive)",
            "Algorithm PREORDER(T)",
            "Algorithm INORDER(T)",
            "Algorithm COPY(T)",
            "Algorithm to Build Expression Tree (from Postfix)",
            "Algorithm to Evaluate Expression Tree",
            "Sorting Algorithms — All types",
            "File Read/Write Code Snippet",
        ],
    },
];

/// Counts of what a seed run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub sections: usize,
    pub topics: usize,
}

/// Load `curriculum` into the catalog unless it already has sections.
///
/// # Errors
///
/// Returns `StorageError` if the catalog cannot be read or written, or
/// `StorageError::Serialization` for seed text that fails validation.
pub async fn seed_if_empty(
    catalog: &dyn CatalogRepository,
    curriculum: &[SeedSection],
) -> Result<SeedReport, StorageError> {
    if !catalog.list_sections().await?.is_empty() {
        tracing::info!("catalog already populated; skipping seed");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    for (index, seed) in curriculum.iter().enumerate() {
        let order = i64::try_from(index + 1)
            .map_err(|_| StorageError::Serialization("section order overflow".into()))?;
        let section = Section::new(SectionId::random(), seed.title, seed.emoji, order)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        catalog.upsert_section(&section).await?;
        report.sections += 1;

        for text in seed.topics {
            let text =
                TopicText::parse(*text).map_err(|e| StorageError::Serialization(e.to_string()))?;
            catalog
                .append_topic(TopicId::random(), &NewTopic::new(section.id(), text))
                .await?;
            report.topics += 1;
        }
        tracing::debug!(title = seed.title, topics = seed.topics.len(), "seeded section");
    }
    tracing::info!(sections = report.sections, topics = report.topics, "seeded curriculum");
    Ok(report)
}
